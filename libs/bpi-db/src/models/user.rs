use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::palliative::{PalliativeOption, PalliativeTier};

/// A balance column on `users` that workflows are allowed to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Main,
    PalliativePool,
    Cashback,
    BpiToken,
    SocialMedia,
    Palliative(PalliativeOption),
}

impl WalletKind {
    pub fn column(&self) -> &'static str {
        match self {
            WalletKind::Main => "wallet",
            WalletKind::PalliativePool => "palliative",
            WalletKind::Cashback => "cashback",
            WalletKind::BpiToken => "bpi_token_wallet",
            WalletKind::SocialMedia => "social_media",
            WalletKind::Palliative(option) => option.wallet_column(),
        }
    }

    /// Where palliative rewards land for a member: their selected track's
    /// sub-wallet once activated, otherwise the pooled balance.
    pub fn palliative_destination(activated: bool, selected: Option<PalliativeOption>) -> Self {
        match (activated, selected) {
            (true, Some(option)) => WalletKind::Palliative(option),
            _ => WalletKind::PalliativePool,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletBalances {
    pub wallet: f64,
    pub spendable: f64,
    pub palliative: f64,
    pub cashback: f64,
    pub bpi_token_wallet: f64,
    pub social_media: f64,
    pub car_wallet: f64,
    pub house_wallet: f64,
    pub land_wallet: f64,
    pub business_wallet: f64,
    pub education_wallet: f64,
    pub solar_wallet: f64,
}

impl WalletBalances {
    pub fn get(&self, kind: WalletKind) -> f64 {
        *self.slot(kind)
    }

    pub fn credit(&mut self, kind: WalletKind, amount: f64) {
        *self.slot_mut(kind) += amount;
    }

    fn slot(&self, kind: WalletKind) -> &f64 {
        match kind {
            WalletKind::Main => &self.wallet,
            WalletKind::PalliativePool => &self.palliative,
            WalletKind::Cashback => &self.cashback,
            WalletKind::BpiToken => &self.bpi_token_wallet,
            WalletKind::SocialMedia => &self.social_media,
            WalletKind::Palliative(PalliativeOption::Car) => &self.car_wallet,
            WalletKind::Palliative(PalliativeOption::House) => &self.house_wallet,
            WalletKind::Palliative(PalliativeOption::Land) => &self.land_wallet,
            WalletKind::Palliative(PalliativeOption::Business) => &self.business_wallet,
            WalletKind::Palliative(PalliativeOption::Education) => &self.education_wallet,
            WalletKind::Palliative(PalliativeOption::Solar) => &self.solar_wallet,
        }
    }

    fn slot_mut(&mut self, kind: WalletKind) -> &mut f64 {
        match kind {
            WalletKind::Main => &mut self.wallet,
            WalletKind::PalliativePool => &mut self.palliative,
            WalletKind::Cashback => &mut self.cashback,
            WalletKind::BpiToken => &mut self.bpi_token_wallet,
            WalletKind::SocialMedia => &mut self.social_media,
            WalletKind::Palliative(PalliativeOption::Car) => &mut self.car_wallet,
            WalletKind::Palliative(PalliativeOption::House) => &mut self.house_wallet,
            WalletKind::Palliative(PalliativeOption::Land) => &mut self.land_wallet,
            WalletKind::Palliative(PalliativeOption::Business) => &mut self.business_wallet,
            WalletKind::Palliative(PalliativeOption::Education) => &mut self.education_wallet,
            WalletKind::Palliative(PalliativeOption::Solar) => &mut self.solar_wallet,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub name: Option<String>,
    pub referrer_id: Option<i64>,
    pub balances: WalletBalances,
    pub active_membership_package_id: Option<i64>,
    pub membership_activated_at: Option<DateTime<Utc>>,
    pub membership_expires_at: Option<DateTime<Utc>>,
    pub palliative_activated: bool,
    pub selected_palliative: Option<PalliativeOption>,
    pub palliative_tier: Option<PalliativeTier>,
    pub myngul_activation_pin: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| format!("Member #{}", self.id))
    }

    /// The selected track, only if it has been activated.
    pub fn active_palliative(&self) -> Option<PalliativeOption> {
        if self.palliative_activated {
            self.selected_palliative
        } else {
            None
        }
    }

    pub fn palliative_wallet(&self) -> WalletKind {
        WalletKind::palliative_destination(self.palliative_activated, self.selected_palliative)
    }
}

/// Membership and palliative fields written at the end of a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipUpdate {
    pub package_id: i64,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub palliative_activated: bool,
    pub selected_palliative: Option<PalliativeOption>,
    pub palliative_tier: PalliativeTier,
    pub myngul_activation_pin: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palliative_credit_routes_to_activated_track_only() {
        assert_eq!(
            WalletKind::palliative_destination(true, Some(PalliativeOption::House)),
            WalletKind::Palliative(PalliativeOption::House)
        );
        assert_eq!(
            WalletKind::palliative_destination(false, Some(PalliativeOption::House)),
            WalletKind::PalliativePool
        );
        assert_eq!(
            WalletKind::palliative_destination(true, None),
            WalletKind::PalliativePool
        );
    }

    #[test]
    fn balances_credit_the_matching_slot() {
        let mut balances = WalletBalances::default();
        balances.credit(WalletKind::Palliative(PalliativeOption::Solar), 250.0);
        balances.credit(WalletKind::BpiToken, 1000.0);

        assert_eq!(balances.solar_wallet, 250.0);
        assert_eq!(balances.get(WalletKind::BpiToken), 1000.0);
        assert_eq!(balances.get(WalletKind::Main), 0.0);
    }

    #[test]
    fn wallet_columns_are_distinct() {
        let mut kinds = vec![
            WalletKind::Main,
            WalletKind::PalliativePool,
            WalletKind::Cashback,
            WalletKind::BpiToken,
            WalletKind::SocialMedia,
        ];
        kinds.extend(PalliativeOption::ALL.into_iter().map(WalletKind::Palliative));

        let mut columns: Vec<_> = kinds.iter().map(|k| k.column()).collect();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), kinds.len());
    }
}
