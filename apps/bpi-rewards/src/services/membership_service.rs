use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use bpi_db::models::ledger::{NewTransaction, TransactionType};
use bpi_db::models::package::{LevelRewards, MembershipPackage};
use bpi_db::models::palliative::{NewPalliativeActivation, PalliativeOption, PalliativeTier};
use bpi_db::models::user::{MembershipUpdate, User, WalletKind};

use crate::config::RewardPolicy;
use crate::error::{RewardError, RewardResult};
use crate::services::ledger_reference;
use crate::services::notification_service::Notification;
use crate::services::referral_service::ReferralService;
use crate::services::token_service::{BptDistribution, TokenService};
use crate::store::MembershipStore;

#[derive(Debug, Clone)]
pub struct ActivationRequest {
    pub user_id: i64,
    pub package_id: i64,
    pub selected_palliative: Option<PalliativeOption>,
    pub payment_reference: String,
    pub payment_method_label: String,
}

#[derive(Debug, Clone)]
pub struct RenewalRequest {
    pub user_id: i64,
    pub payment_reference: String,
    pub payment_method_label: String,
}

/// What one upline member received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDistribution {
    pub level: usize,
    pub referrer_id: i64,
    pub cash: f64,
    pub palliative: f64,
    pub palliative_wallet: WalletKind,
    pub cashback: f64,
    pub bpt: Option<BptDistribution>,
    pub ledger_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MyngulActivation {
    pub credited: f64,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationSummary {
    pub user_id: i64,
    pub package_id: i64,
    pub package_name: String,
    pub palliative_tier: PalliativeTier,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub distributions: Vec<LevelDistribution>,
    pub myngul: Option<MyngulActivation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenewalSummary {
    pub user_id: i64,
    pub package_id: i64,
    pub package_name: String,
    pub fee: f64,
    pub previous_expires_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipState {
    None,
    Active,
    Expired,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipStatus {
    pub user_id: i64,
    pub state: MembershipState,
    pub package_id: Option<i64>,
    pub package_name: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_remaining: i64,
}

/// Why referral rewards are being paid; shapes ledger tags and descriptions.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RewardEvent {
    Activation,
    Upgrade,
}

impl RewardEvent {
    fn label(&self) -> &'static str {
        match self {
            RewardEvent::Activation => "activation",
            RewardEvent::Upgrade => "upgrade",
        }
    }

    fn token_transaction_type(&self) -> &'static str {
        match self {
            RewardEvent::Activation => "MEMBERSHIP_REFERRAL_REWARD",
            RewardEvent::Upgrade => "MEMBERSHIP_UPGRADE_REWARD",
        }
    }
}

/// The member whose payment triggered the rewards.
pub(crate) struct RewardSource<'a> {
    pub event: RewardEvent,
    pub member: &'a User,
    pub package: &'a MembershipPackage,
    pub payment_reference: &'a str,
}

/// Runs the membership workflows against a [`MembershipStore`].
///
/// Notifications are queued on the store, never delivered from here; the
/// caller delivers them after the store's writes are committed.
pub struct MembershipService {
    policy: RewardPolicy,
}

impl MembershipService {
    pub fn new(policy: RewardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    pub async fn activate<S>(&self, store: &mut S, req: ActivationRequest) -> RewardResult<ActivationSummary>
    where
        S: MembershipStore + ?Sized,
    {
        let package = store
            .find_package(req.package_id)
            .await?
            .ok_or(RewardError::PackageNotFound(req.package_id))?;
        if !package.is_active {
            return Err(RewardError::PackageInactive(package.name));
        }
        let user = store
            .lock_user(req.user_id)
            .await?
            .ok_or(RewardError::UserNotFound(req.user_id))?;

        let palliative_tier = self.policy.palliative_tier(&package);
        let high_tier = self.policy.is_high_tier(&package);
        self.ensure_palliative_selection(&package, &user, req.selected_palliative)?;

        let activated_at = Utc::now();
        let expires_at = activated_at + Duration::days(self.policy.membership_days);

        info!(
            "Activating '{}' for user {} (tier {}, payment {})",
            package.name,
            user.id,
            palliative_tier.as_str(),
            req.payment_reference
        );

        let chain =
            ReferralService::get_referral_chain(store, user.id, self.policy.referral_levels()).await?;
        let source = RewardSource {
            event: RewardEvent::Activation,
            member: &user,
            package: &package,
            payment_reference: &req.payment_reference,
        };

        let mut distributions = Vec::with_capacity(chain.len());
        for (idx, referrer_id) in chain.iter().copied().enumerate() {
            let level = idx + 1;
            let rewards = package.rewards.level(level);
            if let Some(distribution) = self
                .credit_referrer(store, level, referrer_id, rewards, &source)
                .await?
            {
                distributions.push(distribution);
            }
        }

        let myngul = if self.policy.is_myngul_package(&package) {
            Some(self.credit_myngul(store, &user, &package, &req.payment_reference).await?)
        } else {
            None
        };

        let (palliative_activated, selected_palliative) = match (high_tier, req.selected_palliative) {
            (true, Some(choice)) => (true, Some(choice)),
            (false, Some(choice)) => {
                debug!(
                    "Ignoring palliative selection {} for non high-tier package '{}'",
                    choice, package.name
                );
                (user.palliative_activated, user.selected_palliative)
            }
            (_, None) => (user.palliative_activated, user.selected_palliative),
        };

        store
            .update_membership(
                user.id,
                MembershipUpdate {
                    package_id: package.id,
                    activated_at,
                    expires_at,
                    palliative_activated,
                    selected_palliative,
                    palliative_tier,
                    myngul_activation_pin: myngul.as_ref().map(|m| m.pin.clone()),
                },
            )
            .await?;

        if let (true, Some(choice)) = (high_tier, req.selected_palliative) {
            store
                .record_palliative_activation(NewPalliativeActivation {
                    user_id: user.id,
                    palliative: choice,
                    package_id: package.id,
                    activated_at,
                })
                .await?;
            info!("User {} activated the {} palliative track", user.id, choice);
        }

        self.record_cost(
            store,
            user.id,
            TransactionType::MembershipActivation,
            package.total_cost(),
            package.vat,
            format!(
                "Membership activation: {} via {}",
                package.name, req.payment_method_label
            ),
            &req.payment_reference,
        )
        .await?;

        store.queue_notification(Notification::MembershipActivated {
            user_id: user.id,
            package_name: package.name.clone(),
            expires_at,
        });

        info!(
            "Activated '{}' for user {}: {} upline levels rewarded, expires {}",
            package.name,
            user.id,
            distributions.len(),
            expires_at
        );

        Ok(ActivationSummary {
            user_id: user.id,
            package_id: package.id,
            package_name: package.name,
            palliative_tier,
            activated_at,
            expires_at,
            distributions,
            myngul,
        })
    }

    /// Extends an active membership by one period, starting from the later
    /// of now and the current expiry. Pays no referral rewards.
    pub async fn renew<S>(&self, store: &mut S, req: RenewalRequest) -> RewardResult<RenewalSummary>
    where
        S: MembershipStore + ?Sized,
    {
        let user = store
            .lock_user(req.user_id)
            .await?
            .ok_or(RewardError::UserNotFound(req.user_id))?;
        let package_id = user
            .active_membership_package_id
            .ok_or(RewardError::NoActiveMembership(user.id))?;
        let package = store
            .find_package(package_id)
            .await?
            .ok_or(RewardError::PackageNotFound(package_id))?;

        let now = Utc::now();
        let base = user.membership_expires_at.map_or(now, |current| current.max(now));
        let expires_at = base + Duration::days(self.policy.membership_days);
        let fee = package.renewal_cost();

        store.update_membership_expiry(user.id, expires_at).await?;
        store
            .insert_transaction(NewTransaction {
                user_id: user.id,
                transaction_type: TransactionType::MembershipRenewal,
                amount: -fee,
                description: format!(
                    "Membership renewal: {} via {}",
                    package.name, req.payment_method_label
                ),
                reference: format!("RENEWAL-{}", req.payment_reference),
            })
            .await?;

        store.queue_notification(Notification::MembershipRenewed {
            user_id: user.id,
            package_name: package.name.clone(),
            expires_at,
        });

        info!("Renewed '{}' for user {} until {}", package.name, user.id, expires_at);

        Ok(RenewalSummary {
            user_id: user.id,
            package_id: package.id,
            package_name: package.name,
            fee,
            previous_expires_at: user.membership_expires_at,
            expires_at,
        })
    }

    pub async fn membership_status<S>(&self, store: &mut S, user_id: i64) -> RewardResult<MembershipStatus>
    where
        S: MembershipStore + ?Sized,
    {
        let user = store
            .find_user(user_id)
            .await?
            .ok_or(RewardError::UserNotFound(user_id))?;

        let package_name = match user.active_membership_package_id {
            Some(id) => store.find_package(id).await?.map(|p| p.name),
            None => None,
        };

        let now = Utc::now();
        let (state, days_remaining) = match (user.active_membership_package_id, user.membership_expires_at) {
            (None, _) => (MembershipState::None, 0),
            (Some(_), Some(expires)) if expires <= now => (MembershipState::Expired, 0),
            (Some(_), Some(expires)) => (MembershipState::Active, (expires - now).num_days()),
            (Some(_), None) => (MembershipState::Active, 0),
        };

        Ok(MembershipStatus {
            user_id,
            state,
            package_id: user.active_membership_package_id,
            package_name,
            activated_at: user.membership_activated_at,
            expires_at: user.membership_expires_at,
            days_remaining,
        })
    }

    pub(crate) fn ensure_palliative_selection(
        &self,
        package: &MembershipPackage,
        user: &User,
        selection: Option<PalliativeOption>,
    ) -> RewardResult<()> {
        if self.policy.is_high_tier(package) && selection.is_none() && user.active_palliative().is_none() {
            return Err(RewardError::PalliativeSelectionRequired {
                package: package.name.clone(),
            });
        }
        Ok(())
    }

    /// Pays one upline member. Every non-zero category gets its own ledger
    /// row; a level with nothing to pay writes nothing.
    pub(crate) async fn credit_referrer<S>(
        &self,
        store: &mut S,
        level: usize,
        referrer_id: i64,
        rewards: LevelRewards,
        source: &RewardSource<'_>,
    ) -> RewardResult<Option<LevelDistribution>>
    where
        S: MembershipStore + ?Sized,
    {
        let referrer = store
            .find_user(referrer_id)
            .await?
            .ok_or(RewardError::UserNotFound(referrer_id))?;

        if rewards.is_zero() {
            debug!(
                "No level {} rewards for referrer {} on '{}'",
                level, referrer_id, source.package.name
            );
            return Ok(None);
        }

        let event = source.event.label();
        let member = source.member.display_name();
        let palliative_wallet = referrer.palliative_wallet();
        let mut ledger_rows = 0;

        let cash = rewards.cash.max(0.0);
        let palliative = rewards.palliative.max(0.0);
        let cashback = rewards.cashback.max(0.0);

        let credits = [
            (cash, WalletKind::Main, TransactionType::ReferralCash, "CASH", "cash"),
            (
                palliative,
                palliative_wallet,
                TransactionType::ReferralPalliative,
                "PALLIATIVE",
                "palliative",
            ),
            (cashback, WalletKind::Cashback, TransactionType::ReferralCashback, "CASHBACK", "cashback"),
        ];

        for (amount, wallet, transaction_type, tag, label) in credits {
            if amount <= 0.0 {
                continue;
            }
            store.increment_wallet(referrer_id, wallet, amount).await?;
            store
                .insert_transaction(NewTransaction {
                    user_id: referrer_id,
                    transaction_type,
                    amount,
                    description: format!(
                        "Level {} referral {} reward from {}'s {} {}",
                        level, label, member, source.package.name, event
                    ),
                    reference: ledger_reference(&format!(
                        "{}-L{}-{}",
                        source.payment_reference, level, tag
                    )),
                })
                .await?;
            ledger_rows += 1;
        }

        let bpt = if rewards.bpt > 0.0 {
            let description = format!(
                "Level {} referral BPT reward from {}'s {} {}",
                level, member, source.package.name, event
            );
            let distribution = TokenService::distribute_bpt_reward(
                store,
                referrer_id,
                rewards.bpt,
                source.event.token_transaction_type(),
                &description,
            )
            .await?;
            store
                .insert_transaction(NewTransaction {
                    user_id: referrer_id,
                    transaction_type: TransactionType::ReferralBpt,
                    amount: distribution.split.user_share,
                    description: format!("{} (50% member share)", description),
                    reference: ledger_reference(&format!(
                        "{}-L{}-BPT",
                        source.payment_reference, level
                    )),
                })
                .await?;
            ledger_rows += 3;
            Some(distribution)
        } else {
            None
        };

        info!(
            "Level {} referrer {} credited: cash {}, palliative {} ({}), cashback {}, bpt {}",
            level,
            referrer_id,
            cash,
            palliative,
            palliative_wallet.column(),
            cashback,
            rewards.bpt.max(0.0)
        );

        store.queue_notification(Notification::ReferralReward {
            referrer_id,
            level,
            from_member: member,
            package_name: source.package.name.clone(),
            rewards,
        });

        Ok(Some(LevelDistribution {
            level,
            referrer_id,
            cash,
            palliative,
            palliative_wallet,
            cashback,
            bpt,
            ledger_rows,
        }))
    }

    pub(crate) async fn credit_myngul<S>(
        &self,
        store: &mut S,
        user: &User,
        package: &MembershipPackage,
        payment_reference: &str,
    ) -> RewardResult<MyngulActivation>
    where
        S: MembershipStore + ?Sized,
    {
        let credited = self.policy.myngul_credit;
        let pin = generate_myngul_pin();

        store
            .increment_wallet(user.id, WalletKind::SocialMedia, credited)
            .await?;
        store
            .insert_transaction(NewTransaction {
                user_id: user.id,
                transaction_type: TransactionType::MyngulActivation,
                amount: credited,
                description: format!("MYNGUL social media credit bundled with {}", package.name),
                reference: format!("MYNGUL-{}", payment_reference),
            })
            .await?;

        info!("Credited {} MYNGUL to user {}", credited, user.id);
        Ok(MyngulActivation { credited, pin })
    }

    /// Writes the negative cost row and, when VAT applies, a separate VAT row.
    pub(crate) async fn record_cost<S>(
        &self,
        store: &mut S,
        user_id: i64,
        transaction_type: TransactionType,
        total: f64,
        vat: f64,
        description: String,
        payment_reference: &str,
    ) -> RewardResult<()>
    where
        S: MembershipStore + ?Sized,
    {
        store
            .insert_transaction(NewTransaction {
                user_id,
                transaction_type,
                amount: -total,
                description,
                reference: format!("{}-{}", transaction_type, payment_reference),
            })
            .await?;

        if vat > 0.0 {
            store
                .insert_transaction(NewTransaction {
                    user_id,
                    transaction_type: TransactionType::Vat,
                    amount: -vat,
                    description: format!("VAT on {}", transaction_type.as_str().to_lowercase()),
                    reference: format!("VAT-{}", payment_reference),
                })
                .await?;
        }
        Ok(())
    }
}

/// `BPI-` followed by eight digits.
pub fn generate_myngul_pin() -> String {
    format!("BPI-{:08}", rand::rng().random_range(0..100_000_000u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn myngul_pin_has_eight_digits() {
        for _ in 0..50 {
            let pin = generate_myngul_pin();
            let digits = pin.strip_prefix("BPI-").unwrap();
            assert_eq!(digits.len(), 8);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
