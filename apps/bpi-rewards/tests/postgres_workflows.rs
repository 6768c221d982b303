//! Workflows against a real PostgreSQL database.
//!
//! Set `DATABASE_URL` to run them; without it every test returns early.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use bpi_db::db::init_db;
use bpi_db::models::system_wallet::BUY_BACK_WALLET;
use bpi_db::repositories::notification_repo::NotificationRepository;
use bpi_rewards::RewardError;
use bpi_rewards::config::RewardPolicy;
use bpi_rewards::services::membership_service::{ActivationRequest, MembershipService};
use bpi_rewards::services::notification_service::{NotificationService, PgNotifier};
use bpi_rewards::store::PgMembershipStore;

// The buy-back row is shared, so tests in this file take turns.
static SERIAL: Mutex<()> = Mutex::const_new(());

const DEADLINE: Duration = Duration::from_secs(10);

async fn pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    Some(init_db(&url, 5).await.expect("database should be reachable"))
}

struct Fixture {
    tag: String,
    package_id: i64,
    sponsor_id: i64,
    member_id: i64,
}

/// Sponsor above member, and a package paying 5,000 cash and 2,000 BPT at level 1.
async fn seed(pool: &PgPool) -> Fixture {
    let tag = Uuid::new_v4().simple().to_string();

    let package_id: i64 = sqlx::query_scalar(
        "INSERT INTO membership_packages (name, price, vat, cash_l1, bpt_l1) \
         VALUES ($1, 285000, 21375, 5000, 2000) RETURNING id",
    )
    .bind(format!("Silver {}", tag))
    .fetch_one(pool)
    .await
    .unwrap();

    let sponsor_id: i64 =
        sqlx::query_scalar("INSERT INTO users (email, name) VALUES ($1, 'Sponsor') RETURNING id")
            .bind(format!("sponsor-{}@example.com", tag))
            .fetch_one(pool)
            .await
            .unwrap();

    let member_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, name, referrer_id) VALUES ($1, 'Member', $2) RETURNING id",
    )
    .bind(format!("member-{}@example.com", tag))
    .bind(sponsor_id)
    .fetch_one(pool)
    .await
    .unwrap();

    Fixture {
        tag,
        package_id,
        sponsor_id,
        member_id,
    }
}

fn request(fx: &Fixture, payment_reference: &str) -> ActivationRequest {
    ActivationRequest {
        user_id: fx.member_id,
        package_id: fx.package_id,
        selected_palliative: None,
        payment_reference: payment_reference.to_string(),
        payment_method_label: "Wallet".to_string(),
    }
}

async fn balances(pool: &PgPool, user_id: i64) -> (f64, f64) {
    sqlx::query_as("SELECT wallet, bpi_token_wallet FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn buy_back(pool: &PgPool) -> f64 {
    sqlx::query_scalar("SELECT balance FROM system_wallets WHERE wallet_type = $1")
        .bind(BUY_BACK_WALLET)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn count(pool: &PgPool, sql: &str, user_id: i64) -> i64 {
    sqlx::query_scalar(sql).bind(user_id).fetch_one(pool).await.unwrap()
}

async fn ledger_rows(pool: &PgPool, user_id: i64) -> (i64, i64) {
    (
        count(pool, "SELECT COUNT(*) FROM transactions WHERE user_id = $1", user_id).await,
        count(pool, "SELECT COUNT(*) FROM token_transactions WHERE user_id = $1", user_id).await,
    )
}

#[tokio::test]
async fn committed_activation_delivers_notifications() {
    let Some(pool) = pool().await else { return };
    let _serial = SERIAL.lock().await;
    let fx = seed(&pool).await;
    let buy_back_before = buy_back(&pool).await;

    let service = MembershipService::new(RewardPolicy::default());
    let notifications = NotificationService::new(Arc::new(PgNotifier::new(pool.clone())));
    let payment = format!("PAY-{}", fx.tag);

    let run = async {
        let mut store = PgMembershipStore::begin(&pool).await?;
        service.activate(&mut store, request(&fx, &payment)).await?;
        let pending = store.commit().await?;
        anyhow::Ok(notifications.deliver(pending).await)
    };
    let delivered = tokio::time::timeout(DEADLINE, run)
        .await
        .expect("activation blocked on its own row locks")
        .unwrap();

    assert_eq!(delivered, 2);
    assert_eq!(balances(&pool, fx.sponsor_id).await, (5000.0, 1000.0));
    assert!((buy_back(&pool).await - buy_back_before - 1000.0).abs() < 1e-6);
    assert_eq!(ledger_rows(&pool, fx.sponsor_id).await, (2, 1));
    assert_eq!(ledger_rows(&pool, fx.member_id).await, (2, 0));

    let repo = NotificationRepository::new(pool.clone());
    let sponsor_inbox = repo.get_unread(fx.sponsor_id).await.unwrap();
    assert_eq!(sponsor_inbox.len(), 1);
    assert!(sponsor_inbox[0].message.contains("₦5000.00 cash"));
    let member_inbox = repo.get_unread(fx.member_id).await.unwrap();
    assert_eq!(member_inbox.len(), 1);
    assert_eq!(member_inbox[0].title, "Membership Activated");
}

#[tokio::test]
async fn failed_activation_rolls_back_everything() {
    let Some(pool) = pool().await else { return };
    let _serial = SERIAL.lock().await;
    let fx = seed(&pool).await;
    let payment = format!("PAY-{}", fx.tag);

    // An earlier payment already used this reference, so the cost row collides
    // after the sponsor has been credited inside the transaction.
    sqlx::query(
        "INSERT INTO transactions (user_id, transaction_type, amount, description, reference) \
         VALUES ($1, 'MEMBERSHIP_ACTIVATION', 0, 'earlier payment', $2)",
    )
    .bind(fx.member_id)
    .bind(format!("MEMBERSHIP_ACTIVATION-{}", payment))
    .execute(&pool)
    .await
    .unwrap();

    let buy_back_before = buy_back(&pool).await;
    let service = MembershipService::new(RewardPolicy::default());

    let run = async {
        let mut store = PgMembershipStore::begin(&pool).await?;
        let outcome = service.activate(&mut store, request(&fx, &payment)).await;
        store.rollback().await?;
        anyhow::Ok(outcome)
    };
    let outcome = tokio::time::timeout(DEADLINE, run).await.unwrap().unwrap();

    assert!(matches!(outcome, Err(RewardError::Store(_))));
    assert_eq!(balances(&pool, fx.sponsor_id).await, (0.0, 0.0));
    assert_eq!(buy_back(&pool).await, buy_back_before);
    assert_eq!(ledger_rows(&pool, fx.sponsor_id).await, (0, 0));
    assert_eq!(ledger_rows(&pool, fx.member_id).await, (1, 0));

    let package: Option<i64> =
        sqlx::query_scalar("SELECT active_membership_package_id FROM users WHERE id = $1")
            .bind(fx.member_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(package.is_none());

    let repo = NotificationRepository::new(pool.clone());
    assert!(repo.get_unread(fx.sponsor_id).await.unwrap().is_empty());
    assert!(repo.get_unread(fx.member_id).await.unwrap().is_empty());
}
