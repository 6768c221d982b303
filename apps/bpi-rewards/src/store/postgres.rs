use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use bpi_db::models::ledger::{NewTokenTransaction, NewTransaction};
use bpi_db::models::package::MembershipPackage;
use bpi_db::models::palliative::NewPalliativeActivation;
use bpi_db::models::system_wallet::BUY_BACK_WALLET;
use bpi_db::models::user::{MembershipUpdate, User, WalletKind};
use bpi_db::repositories::ledger_repo::{TokenTransactionRepository, TransactionRepository};
use bpi_db::repositories::package_repo::PackageRepository;
use bpi_db::repositories::palliative_repo::PalliativeActivationRepository;
use bpi_db::repositories::system_wallet_repo::SystemWalletRepository;
use bpi_db::repositories::user_repo::UserRepository;

use super::MembershipStore;
use crate::services::notification_service::Notification;

/// Store bound to one open database transaction.
///
/// Dropping it without `commit` rolls every write back and discards the
/// queued notifications.
pub struct PgMembershipStore<'c> {
    tx: Transaction<'c, Postgres>,
    outbox: Vec<Notification>,
}

impl PgMembershipStore<'static> {
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await.context("Failed to open transaction")?;
        Ok(Self {
            tx,
            outbox: Vec::new(),
        })
    }
}

impl PgMembershipStore<'_> {
    /// Commits the transaction and returns the notifications queued by the
    /// workflow, which are now safe to deliver.
    pub async fn commit(self) -> Result<Vec<Notification>> {
        self.tx.commit().await.context("Failed to commit transaction")?;
        Ok(self.outbox)
    }

    pub async fn rollback(self) -> Result<()> {
        if !self.outbox.is_empty() {
            tracing::debug!("Discarding {} queued notifications", self.outbox.len());
        }
        self.tx.rollback().await.context("Failed to roll back transaction")
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore<'_> {
    async fn find_package(&mut self, id: i64) -> Result<Option<MembershipPackage>> {
        PackageRepository::get_by_id(&mut self.tx, id).await
    }

    async fn find_user(&mut self, id: i64) -> Result<Option<User>> {
        UserRepository::get_by_id(&mut self.tx, id).await
    }

    async fn lock_user(&mut self, id: i64) -> Result<Option<User>> {
        UserRepository::get_for_update(&mut self.tx, id).await
    }

    async fn find_referrer_id(&mut self, user_id: i64) -> Result<Option<i64>> {
        UserRepository::get_referrer_id(&mut self.tx, user_id).await
    }

    async fn increment_wallet(&mut self, user_id: i64, wallet: WalletKind, amount: f64) -> Result<()> {
        UserRepository::increment_wallet(&mut self.tx, user_id, wallet, amount).await
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<i64> {
        TransactionRepository::insert(&mut self.tx, &tx).await
    }

    async fn insert_token_transaction(&mut self, tx: NewTokenTransaction) -> Result<i64> {
        TokenTransactionRepository::insert(&mut self.tx, &tx).await
    }

    async fn credit_buy_back(&mut self, amount: f64) -> Result<f64> {
        SystemWalletRepository::increment(&mut self.tx, BUY_BACK_WALLET, amount).await
    }

    async fn update_membership(&mut self, user_id: i64, update: MembershipUpdate) -> Result<()> {
        UserRepository::update_membership(&mut self.tx, user_id, &update).await
    }

    async fn update_membership_expiry(&mut self, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        UserRepository::update_expiry(&mut self.tx, user_id, expires_at).await
    }

    async fn record_palliative_activation(&mut self, activation: NewPalliativeActivation) -> Result<()> {
        PalliativeActivationRepository::record(&mut self.tx, &activation).await
    }

    fn queue_notification(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }
}
