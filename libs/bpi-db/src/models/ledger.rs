use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    MembershipActivation,
    MembershipUpgrade,
    MembershipRenewal,
    Vat,
    ReferralCash,
    ReferralPalliative,
    ReferralCashback,
    ReferralBpt,
    MyngulActivation,
    PalliativeTransfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::MembershipActivation => "MEMBERSHIP_ACTIVATION",
            TransactionType::MembershipUpgrade => "MEMBERSHIP_UPGRADE",
            TransactionType::MembershipRenewal => "MEMBERSHIP_RENEWAL",
            TransactionType::Vat => "VAT",
            TransactionType::ReferralCash => "REFERRAL_CASH",
            TransactionType::ReferralPalliative => "REFERRAL_PALLIATIVE",
            TransactionType::ReferralCashback => "REFERRAL_CASHBACK",
            TransactionType::ReferralBpt => "REFERRAL_BPT",
            TransactionType::MyngulActivation => "MYNGUL_ACTIVATION",
            TransactionType::PalliativeTransfer => "PALLIATIVE_TRANSFER",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub transaction_type: String,
    pub amount: f64,
    pub description: String,
    pub status: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: i64,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: String,
    pub reference: String,
}

/// Which side of a BPT split a token ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenSource {
    Member,
    BuyBack,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Member => "MEMBER",
            TokenSource::BuyBack => "BUY_BACK",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenTransaction {
    pub id: i64,
    pub user_id: Option<i64>,
    pub transaction_type: String,
    pub source: String,
    pub gross_amount: f64,
    pub amount: f64,
    pub description: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTokenTransaction {
    /// `None` for the buy-back share.
    pub user_id: Option<i64>,
    pub transaction_type: String,
    pub source: TokenSource,
    pub gross_amount: f64,
    pub amount: f64,
    pub description: String,
    pub reference: String,
}
