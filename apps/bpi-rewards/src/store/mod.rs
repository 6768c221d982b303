use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bpi_db::models::ledger::{NewTokenTransaction, NewTransaction};
use bpi_db::models::package::MembershipPackage;
use bpi_db::models::palliative::NewPalliativeActivation;
use bpi_db::models::user::{MembershipUpdate, User, WalletKind};

use crate::services::notification_service::Notification;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgMembershipStore;

/// Everything the membership workflows read and write.
///
/// A single store value is one atomic unit: the Postgres implementation wraps
/// one database transaction, so all writes of a workflow commit or roll back
/// together. Notifications are queued on the store and only handed out once
/// those writes are committed.
#[async_trait]
pub trait MembershipStore: Send {
    async fn find_package(&mut self, id: i64) -> Result<Option<MembershipPackage>>;

    async fn find_user(&mut self, id: i64) -> Result<Option<User>>;

    /// Like `find_user`, but holds the row against concurrent workflows.
    async fn lock_user(&mut self, id: i64) -> Result<Option<User>>;

    async fn find_referrer_id(&mut self, user_id: i64) -> Result<Option<i64>>;

    async fn increment_wallet(&mut self, user_id: i64, wallet: WalletKind, amount: f64) -> Result<()>;

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<i64>;

    async fn insert_token_transaction(&mut self, tx: NewTokenTransaction) -> Result<i64>;

    /// Credits the shared buy-back pool and returns its new balance.
    async fn credit_buy_back(&mut self, amount: f64) -> Result<f64>;

    async fn update_membership(&mut self, user_id: i64, update: MembershipUpdate) -> Result<()>;

    async fn update_membership_expiry(&mut self, user_id: i64, expires_at: DateTime<Utc>) -> Result<()>;

    async fn record_palliative_activation(&mut self, activation: NewPalliativeActivation) -> Result<()>;

    fn queue_notification(&mut self, notification: Notification);
}
