use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use bpi_db::models::ledger::{NewTransaction, TransactionType};
use bpi_db::models::palliative::{NewPalliativeActivation, PalliativeOption, PalliativeTier};
use bpi_db::models::user::{MembershipUpdate, WalletKind};

use crate::error::{RewardError, RewardResult};
use crate::services::membership_service::{
    LevelDistribution, MembershipService, MyngulActivation, RewardEvent, RewardSource,
};
use crate::services::notification_service::Notification;
use crate::services::referral_service::ReferralService;
use crate::services::token_service::round2;
use crate::store::MembershipStore;

#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    pub user_id: i64,
    /// Package being upgraded to.
    pub package_id: i64,
    pub selected_palliative: Option<PalliativeOption>,
    pub payment_reference: String,
    pub payment_method_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PalliativeTransfer {
    pub amount: f64,
    pub to_wallet: WalletKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeSummary {
    pub user_id: i64,
    pub from_package_id: i64,
    pub from_package: String,
    pub to_package_id: i64,
    pub to_package: String,
    pub upgrade_cost: f64,
    pub vat_difference: f64,
    pub palliative_tier: PalliativeTier,
    pub expires_at: DateTime<Utc>,
    pub distributions: Vec<LevelDistribution>,
    pub palliative_transfer: Option<PalliativeTransfer>,
    pub myngul: Option<MyngulActivation>,
}

impl MembershipService {
    /// Moves an active member to a more expensive package, paying each upline
    /// level only the increase between the two packages' reward tables.
    pub async fn upgrade<S>(&self, store: &mut S, req: UpgradeRequest) -> RewardResult<UpgradeSummary>
    where
        S: MembershipStore + ?Sized,
    {
        let user = store
            .lock_user(req.user_id)
            .await?
            .ok_or(RewardError::UserNotFound(req.user_id))?;
        let current_id = user
            .active_membership_package_id
            .ok_or(RewardError::NoActiveMembership(user.id))?;
        let current = store
            .find_package(current_id)
            .await?
            .ok_or(RewardError::PackageNotFound(current_id))?;
        let target = store
            .find_package(req.package_id)
            .await?
            .ok_or(RewardError::PackageNotFound(req.package_id))?;
        if !target.is_active {
            return Err(RewardError::PackageInactive(target.name));
        }

        let upgrade_cost = round2(target.price - current.price);
        if upgrade_cost <= 0.0 {
            return Err(RewardError::NonPositiveUpgradeCost {
                from: current.name.clone(),
                to: target.name.clone(),
                cost: upgrade_cost,
            });
        }
        let vat_difference = round2(target.vat - current.vat).max(0.0);

        let policy = self.policy();
        self.ensure_palliative_selection(&target, &user, req.selected_palliative)?;
        let high_tier = policy.is_high_tier(&target);
        let palliative_tier = policy.palliative_tier(&target);

        let now = Utc::now();
        let expires_at = now + Duration::days(policy.membership_days);

        info!(
            "Upgrading user {} from '{}' to '{}' (cost {}, payment {})",
            user.id, current.name, target.name, upgrade_cost, req.payment_reference
        );

        let chain = ReferralService::get_referral_chain(store, user.id, policy.referral_levels()).await?;
        let source = RewardSource {
            event: RewardEvent::Upgrade,
            member: &user,
            package: &target,
            payment_reference: &req.payment_reference,
        };

        let mut distributions = Vec::with_capacity(chain.len());
        for (idx, referrer_id) in chain.iter().copied().enumerate() {
            let level = idx + 1;
            let increase = target
                .rewards
                .level(level)
                .increase_over(&current.rewards.level(level));
            if let Some(distribution) = self
                .credit_referrer(store, level, referrer_id, increase, &source)
                .await?
            {
                distributions.push(distribution);
            }
        }

        let new_selection = if high_tier { req.selected_palliative } else { None };
        let effective_selection = new_selection.or(user.active_palliative());

        let palliative_transfer = match effective_selection {
            Some(option) if high_tier && user.balances.palliative > 0.0 => {
                let amount = user.balances.palliative;
                let to_wallet = WalletKind::Palliative(option);
                store
                    .increment_wallet(user.id, WalletKind::PalliativePool, -amount)
                    .await?;
                store.increment_wallet(user.id, to_wallet, amount).await?;
                store
                    .insert_transaction(NewTransaction {
                        user_id: user.id,
                        transaction_type: TransactionType::PalliativeTransfer,
                        amount,
                        description: format!(
                            "Moved pooled palliative balance into {} wallet on upgrade to {}",
                            option, target.name
                        ),
                        reference: format!("PALLIATIVE-TRANSFER-{}", req.payment_reference),
                    })
                    .await?;
                info!(
                    "Moved {} pooled palliative of user {} into {}",
                    amount,
                    user.id,
                    to_wallet.column()
                );
                Some(PalliativeTransfer { amount, to_wallet })
            }
            _ => None,
        };

        let first_myngul = policy.is_myngul_package(&target)
            && !policy.is_myngul_package(&current)
            && user.myngul_activation_pin.is_none();
        let myngul = if first_myngul {
            Some(self.credit_myngul(store, &user, &target, &req.payment_reference).await?)
        } else {
            None
        };

        let (palliative_activated, selected_palliative) = match new_selection {
            Some(choice) => (true, Some(choice)),
            None => (user.palliative_activated, user.selected_palliative),
        };

        store
            .update_membership(
                user.id,
                MembershipUpdate {
                    package_id: target.id,
                    activated_at: user.membership_activated_at.unwrap_or(now),
                    expires_at,
                    palliative_activated,
                    selected_palliative,
                    palliative_tier,
                    myngul_activation_pin: myngul.as_ref().map(|m| m.pin.clone()),
                },
            )
            .await?;

        if let Some(choice) = new_selection {
            store
                .record_palliative_activation(NewPalliativeActivation {
                    user_id: user.id,
                    palliative: choice,
                    package_id: target.id,
                    activated_at: now,
                })
                .await?;
        }

        self.record_cost(
            store,
            user.id,
            TransactionType::MembershipUpgrade,
            upgrade_cost + vat_difference,
            vat_difference,
            format!(
                "Membership upgrade: {} to {} via {}",
                current.name, target.name, req.payment_method_label
            ),
            &req.payment_reference,
        )
        .await?;

        store.queue_notification(Notification::MembershipUpgraded {
            user_id: user.id,
            from_package: current.name.clone(),
            to_package: target.name.clone(),
            expires_at,
        });

        info!(
            "Upgraded user {} to '{}': {} upline levels rewarded",
            user.id,
            target.name,
            distributions.len()
        );

        Ok(UpgradeSummary {
            user_id: user.id,
            from_package_id: current.id,
            from_package: current.name,
            to_package_id: target.id,
            to_package: target.name,
            upgrade_cost,
            vat_difference,
            palliative_tier,
            expires_at,
            distributions,
            palliative_transfer,
            myngul,
        })
    }
}
