use serde::Serialize;
use tracing::info;

use bpi_db::models::ledger::{NewTokenTransaction, TokenSource};
use bpi_db::models::user::WalletKind;

use crate::error::{RewardError, RewardResult};
use crate::services::ledger_reference;
use crate::store::MembershipStore;

/// Largest gap allowed between the gross amount and the sum of its halves.
pub const SPLIT_TOLERANCE: f64 = 0.01;

// Absorbs binary representation error when the gap is exactly one cent.
const FLOAT_SLACK: f64 = 1e-9;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BptSplit {
    pub total: f64,
    pub user_share: f64,
    pub buy_back: f64,
}

impl BptSplit {
    /// 50/50 split of a gross BPT reward between the member and the buy-back pool.
    pub fn compute(total: f64) -> RewardResult<Self> {
        if !total.is_finite() || total <= 0.0 {
            return Err(RewardError::NonPositiveReward(total));
        }

        let user_share = round2(total / 2.0);
        let buy_back = round2(total / 2.0);

        if (user_share + buy_back - total).abs() > SPLIT_TOLERANCE + FLOAT_SLACK {
            return Err(RewardError::SplitMismatch {
                total,
                user_share,
                buy_back,
            });
        }

        Ok(Self {
            total,
            user_share,
            buy_back,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BptDistribution {
    pub user_id: i64,
    pub split: BptSplit,
    pub user_balance: f64,
    pub buy_back_balance: f64,
}

pub struct TokenService;

impl TokenService {
    /// Credits half of `total` to the member's BPT wallet and half to the
    /// buy-back pool, writing one token ledger row for each side.
    pub async fn distribute_bpt_reward<S>(
        store: &mut S,
        user_id: i64,
        total: f64,
        transaction_type: &str,
        description: &str,
    ) -> RewardResult<BptDistribution>
    where
        S: MembershipStore + ?Sized,
    {
        let split = BptSplit::compute(total)?;

        let user = store
            .find_user(user_id)
            .await?
            .ok_or(RewardError::UserNotFound(user_id))?;
        let user_balance = user.balances.bpi_token_wallet + split.user_share;
        if user_balance < 0.0 {
            return Err(RewardError::NegativeBalance {
                user_id,
                balance: user_balance,
            });
        }

        store
            .increment_wallet(user_id, WalletKind::BpiToken, split.user_share)
            .await?;
        let buy_back_balance = store.credit_buy_back(split.buy_back).await?;

        store
            .insert_token_transaction(NewTokenTransaction {
                user_id: Some(user_id),
                transaction_type: transaction_type.to_string(),
                source: TokenSource::Member,
                gross_amount: split.total,
                amount: split.user_share,
                description: format!("{} (member share)", description),
                reference: ledger_reference("BPT-MEMBER"),
            })
            .await?;
        store
            .insert_token_transaction(NewTokenTransaction {
                user_id: None,
                transaction_type: transaction_type.to_string(),
                source: TokenSource::BuyBack,
                gross_amount: split.total,
                amount: split.buy_back,
                description: format!("{} (buy-back share from user {})", description, user_id),
                reference: ledger_reference("BPT-BUYBACK"),
            })
            .await?;

        info!(
            "Distributed {} BPT for user {}: {} to member, {} to buy-back (pool now {})",
            split.total, user_id, split.user_share, split.buy_back, buy_back_balance
        );

        Ok(BptDistribution {
            user_id,
            split,
            user_balance,
            buy_back_balance,
        })
    }
}
