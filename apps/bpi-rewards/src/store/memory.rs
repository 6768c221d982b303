use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use bpi_db::models::ledger::{NewTokenTransaction, NewTransaction};
use bpi_db::models::package::MembershipPackage;
use bpi_db::models::palliative::NewPalliativeActivation;
use bpi_db::models::user::{MembershipUpdate, User, WalletKind};

use super::MembershipStore;
use crate::services::notification_service::Notification;

/// In-process store for exercising the workflows without a database.
///
/// Mirrors the database constraints that matter to the workflows: unknown
/// users are errors and ledger references are unique.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub packages: HashMap<i64, MembershipPackage>,
    pub users: HashMap<i64, User>,
    pub transactions: Vec<NewTransaction>,
    pub token_transactions: Vec<NewTokenTransaction>,
    pub palliative_activations: Vec<NewPalliativeActivation>,
    pub buy_back_balance: f64,
    /// Notifications queued by workflows and not yet taken for delivery.
    pub outbox: Vec<Notification>,
    references: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, package: MembershipPackage) -> Self {
        self.packages.insert(package.id, package);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn user(&self, id: i64) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn transactions_for(&self, user_id: i64) -> Vec<&NewTransaction> {
        self.transactions.iter().filter(|t| t.user_id == user_id).collect()
    }

    pub fn token_transactions_for(&self, user_id: i64) -> Vec<&NewTokenTransaction> {
        self.token_transactions
            .iter()
            .filter(|t| t.user_id == Some(user_id))
            .collect()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    fn claim_reference(&mut self, reference: &str) -> Result<()> {
        if !self.references.insert(reference.to_string()) {
            return Err(anyhow!("Duplicate ledger reference {}", reference));
        }
        Ok(())
    }

    fn user_mut(&mut self, id: i64) -> Result<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| anyhow!("User {} not found", id))
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn find_package(&mut self, id: i64) -> Result<Option<MembershipPackage>> {
        Ok(self.packages.get(&id).cloned())
    }

    async fn find_user(&mut self, id: i64) -> Result<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    async fn lock_user(&mut self, id: i64) -> Result<Option<User>> {
        self.find_user(id).await
    }

    async fn find_referrer_id(&mut self, user_id: i64) -> Result<Option<i64>> {
        Ok(self.users.get(&user_id).and_then(|u| u.referrer_id))
    }

    async fn increment_wallet(&mut self, user_id: i64, wallet: WalletKind, amount: f64) -> Result<()> {
        self.user_mut(user_id)?.balances.credit(wallet, amount);
        Ok(())
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<i64> {
        if !self.users.contains_key(&tx.user_id) {
            return Err(anyhow!("User {} not found", tx.user_id));
        }
        self.claim_reference(&tx.reference)?;
        self.transactions.push(tx);
        Ok(self.transactions.len() as i64)
    }

    async fn insert_token_transaction(&mut self, tx: NewTokenTransaction) -> Result<i64> {
        self.claim_reference(&tx.reference)?;
        self.token_transactions.push(tx);
        Ok(self.token_transactions.len() as i64)
    }

    async fn credit_buy_back(&mut self, amount: f64) -> Result<f64> {
        self.buy_back_balance += amount;
        Ok(self.buy_back_balance)
    }

    async fn update_membership(&mut self, user_id: i64, update: MembershipUpdate) -> Result<()> {
        let user = self.user_mut(user_id)?;
        user.active_membership_package_id = Some(update.package_id);
        user.membership_activated_at = Some(update.activated_at);
        user.membership_expires_at = Some(update.expires_at);
        user.palliative_activated = update.palliative_activated;
        user.selected_palliative = update.selected_palliative;
        user.palliative_tier = Some(update.palliative_tier);
        if update.myngul_activation_pin.is_some() {
            user.myngul_activation_pin = update.myngul_activation_pin;
        }
        Ok(())
    }

    async fn update_membership_expiry(&mut self, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.user_mut(user_id)?.membership_expires_at = Some(expires_at);
        Ok(())
    }

    async fn record_palliative_activation(&mut self, activation: NewPalliativeActivation) -> Result<()> {
        self.palliative_activations
            .retain(|existing| existing.user_id != activation.user_id);
        self.palliative_activations.push(activation);
        Ok(())
    }

    fn queue_notification(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }
}
