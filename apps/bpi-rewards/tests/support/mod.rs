#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use bpi_db::models::package::{LevelRewards, MembershipPackage, RewardTable};
use bpi_db::models::user::{User, WalletBalances};
use bpi_rewards::config::RewardPolicy;
use bpi_rewards::services::membership_service::MembershipService;
use bpi_rewards::services::notification_service::{Notification, Notifier};
use bpi_rewards::store::MemoryStore;

pub fn rewards(cash: f64, palliative: f64, bpt: f64, cashback: f64) -> LevelRewards {
    LevelRewards {
        cash,
        palliative,
        bpt,
        cashback,
    }
}

pub fn package(id: i64, name: &str, price: f64, vat: f64, levels: [LevelRewards; 4]) -> MembershipPackage {
    MembershipPackage {
        id,
        name: name.to_string(),
        price,
        vat,
        renewal_fee: None,
        rewards: RewardTable::new(levels),
        is_active: true,
    }
}

pub fn flat_package(id: i64, name: &str, price: f64, level: LevelRewards) -> MembershipPackage {
    package(id, name, price, 0.0, [level; 4])
}

pub fn member(id: i64, referrer_id: Option<i64>) -> User {
    User {
        id,
        name: Some(format!("member-{}", id)),
        referrer_id,
        ..User::default()
    }
}

/// Users 1..=len where each user is referred by the previous one.
pub fn referral_line(len: i64) -> Vec<User> {
    (1..=len)
        .map(|id| member(id, if id == 1 { None } else { Some(id - 1) }))
        .collect()
}

pub fn policy() -> RewardPolicy {
    RewardPolicy {
        high_tier_packages: vec!["Gold Plus".to_string()],
        myngul_packages: vec!["Regular Plus".to_string(), "Gold Plus".to_string()],
        ..RewardPolicy::default()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<()> {
        Err(anyhow::anyhow!("notification backend unavailable"))
    }
}

pub fn service() -> MembershipService {
    MembershipService::new(policy())
}

pub fn store_with(users: Vec<User>, packages: Vec<MembershipPackage>) -> MemoryStore {
    let store = users.into_iter().fold(MemoryStore::new(), MemoryStore::with_user);
    packages.into_iter().fold(store, MemoryStore::with_package)
}

/// Every user's balances, ordered by id.
pub fn balances(store: &MemoryStore) -> Vec<(i64, WalletBalances)> {
    let mut all: Vec<_> = store
        .users
        .values()
        .map(|u| (u.id, u.balances.clone()))
        .collect();
    all.sort_by_key(|(id, _)| *id);
    all
}

pub fn assert_untouched(before: &MemoryStore, after: &MemoryStore) {
    assert_eq!(balances(before), balances(after));
    assert_eq!(before.transactions, after.transactions);
    assert_eq!(before.token_transactions, after.token_transactions);
    assert_eq!(before.palliative_activations, after.palliative_activations);
    assert_eq!(before.buy_back_balance, after.buy_back_balance);
}
