pub mod membership_service;
pub mod membership_upgrade;
pub mod notification_service;
pub mod referral_service;
pub mod token_service;

use uuid::Uuid;

/// Unique ledger reference, e.g. `PAY-77-L1-CASH-3f2a...`.
pub(crate) fn ledger_reference(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}
