use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use bpi_db::models::package::LevelRewards;
use bpi_db::repositories::notification_repo::NotificationRepository;

/// User-facing message emitted by the membership workflows.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    MembershipActivated {
        user_id: i64,
        package_name: String,
        expires_at: DateTime<Utc>,
    },
    MembershipUpgraded {
        user_id: i64,
        from_package: String,
        to_package: String,
        expires_at: DateTime<Utc>,
    },
    MembershipRenewed {
        user_id: i64,
        package_name: String,
        expires_at: DateTime<Utc>,
    },
    ReferralReward {
        referrer_id: i64,
        level: usize,
        from_member: String,
        package_name: String,
        rewards: LevelRewards,
    },
}

impl Notification {
    pub fn recipient(&self) -> i64 {
        match self {
            Notification::MembershipActivated { user_id, .. }
            | Notification::MembershipUpgraded { user_id, .. }
            | Notification::MembershipRenewed { user_id, .. } => *user_id,
            Notification::ReferralReward { referrer_id, .. } => *referrer_id,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Notification::MembershipActivated { .. } => "Membership Activated",
            Notification::MembershipUpgraded { .. } => "Membership Upgraded",
            Notification::MembershipRenewed { .. } => "Membership Renewed",
            Notification::ReferralReward { .. } => "Referral Reward Received",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notification::MembershipActivated {
                package_name,
                expires_at,
                ..
            } => format!(
                "Your {} membership is now active. It expires on {}.",
                package_name,
                expires_at.format("%Y-%m-%d")
            ),
            Notification::MembershipUpgraded {
                from_package,
                to_package,
                expires_at,
                ..
            } => format!(
                "Your membership was upgraded from {} to {}. It now expires on {}.",
                from_package,
                to_package,
                expires_at.format("%Y-%m-%d")
            ),
            Notification::MembershipRenewed {
                package_name,
                expires_at,
                ..
            } => format!(
                "Your {} membership was renewed until {}.",
                package_name,
                expires_at.format("%Y-%m-%d")
            ),
            Notification::ReferralReward {
                level,
                from_member,
                package_name,
                rewards,
                ..
            } => {
                let mut parts = Vec::new();
                if rewards.cash > 0.0 {
                    parts.push(format!("₦{:.2} cash", rewards.cash));
                }
                if rewards.palliative > 0.0 {
                    parts.push(format!("₦{:.2} palliative", rewards.palliative));
                }
                if rewards.cashback > 0.0 {
                    parts.push(format!("₦{:.2} cashback", rewards.cashback));
                }
                if rewards.bpt > 0.0 {
                    parts.push(format!("{:.2} BPT", rewards.bpt));
                }
                format!(
                    "You earned {} as a level {} referral reward from {}'s {} membership.",
                    parts.join(", "),
                    level,
                    from_member,
                    package_name
                )
            }
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Persists notifications through the pool, outside any workflow transaction.
pub struct PgNotifier {
    repo: NotificationRepository,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: NotificationRepository::new(pool),
        }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.repo
            .create(notification.recipient(), notification.title(), &notification.message())
            .await?;
        Ok(())
    }
}

/// Best-effort delivery of notifications a workflow queued.
///
/// Only call this after the workflow's writes are committed: the Postgres
/// notifier inserts through the pool and references the locked user rows.
/// A failed notification is logged and never reaches the caller.
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn send(&self, notification: Notification) -> bool {
        match self.notifier.notify(&notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to deliver '{}' to user {}: {:#}",
                    notification.title(),
                    notification.recipient(),
                    e
                );
                false
            }
        }
    }

    /// Sends each queued notification in order and returns how many were delivered.
    pub async fn deliver(&self, pending: Vec<Notification>) -> usize {
        let total = pending.len();
        let mut delivered = 0;
        for notification in pending {
            if self.send(notification).await {
                delivered += 1;
            }
        }
        if delivered < total {
            warn!("Delivered {} of {} notifications", delivered, total);
        } else if total > 0 {
            info!("Delivered {} notifications", total);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _notification: &Notification) -> Result<()> {
            Err(anyhow::anyhow!("smtp down"))
        }
    }

    #[test]
    fn referral_message_lists_only_paid_categories() {
        let notification = Notification::ReferralReward {
            referrer_id: 7,
            level: 2,
            from_member: "Ada".to_string(),
            package_name: "Regular Plus".to_string(),
            rewards: LevelRewards {
                cash: 5000.0,
                palliative: 0.0,
                bpt: 1000.0,
                cashback: 0.0,
            },
        };

        let message = notification.message();
        assert_eq!(notification.recipient(), 7);
        assert!(message.contains("₦5000.00 cash"));
        assert!(message.contains("1000.00 BPT"));
        assert!(message.contains("level 2"));
        assert!(!message.contains("palliative"));
    }

    #[derive(Default)]
    struct Inbox(std::sync::Mutex<Vec<i64>>);

    #[async_trait]
    impl Notifier for Inbox {
        async fn notify(&self, notification: &Notification) -> Result<()> {
            self.0.lock().unwrap().push(notification.recipient());
            Ok(())
        }
    }

    fn renewed(user_id: i64) -> Notification {
        Notification::MembershipRenewed {
            user_id,
            package_name: "Regular".to_string(),
            expires_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn deliver_sends_in_queue_order() {
        let inbox = Arc::new(Inbox::default());
        let service = NotificationService::new(inbox.clone());

        let delivered = service.deliver(vec![renewed(3), renewed(1), renewed(2)]).await;

        assert_eq!(delivered, 3);
        assert_eq!(*inbox.0.lock().unwrap(), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn deliver_counts_only_successful_sends() {
        let service = NotificationService::new(Arc::new(FailingNotifier));
        assert_eq!(service.deliver(vec![renewed(1), renewed(2)]).await, 0);
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed() {
        let service = NotificationService::new(Arc::new(FailingNotifier));
        let delivered = service
            .send(Notification::MembershipRenewed {
                user_id: 1,
                package_name: "Regular".to_string(),
                expires_at: Utc::now(),
            })
            .await;
        assert!(!delivered);
    }
}
