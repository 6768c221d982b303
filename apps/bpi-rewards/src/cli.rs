use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

use bpi_db::db::init_db;
use bpi_db::models::palliative::PalliativeOption;
use bpi_db::models::system_wallet::BUY_BACK_WALLET;
use bpi_db::repositories::ledger_repo::{TokenTransactionRepository, TransactionRepository};
use bpi_db::repositories::notification_repo::NotificationRepository;
use bpi_db::repositories::package_repo::PackageRepository;
use bpi_db::repositories::system_wallet_repo::SystemWalletRepository;

use crate::config::RewardsConfig;
use crate::error::RewardResult;
use crate::services::membership_service::{ActivationRequest, MembershipService, RenewalRequest};
use crate::services::membership_upgrade::UpgradeRequest;
use crate::services::notification_service::{NotificationService, PgNotifier};
use crate::services::referral_service::ReferralService;
use crate::store::PgMembershipStore;

#[derive(Debug, Parser)]
#[command(name = "bpi-rewards", version, about = "Membership activation and referral reward engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Activate a membership package and pay the referral upline
    Activate(MembershipArgs),
    /// Upgrade an active membership to a higher package
    Upgrade(MembershipArgs),
    /// Extend an active membership by one period
    Renew(RenewArgs),
    /// Show a member's membership state
    Status {
        #[arg(long)]
        user_id: i64,
    },
    /// Print a member's referral upline
    Chain {
        #[arg(long)]
        user_id: i64,
        #[arg(long, default_value_t = 4)]
        levels: usize,
    },
    /// List a member's ledger entries
    History {
        #[arg(long)]
        user_id: i64,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List active membership packages
    Packages,
    /// Show the buy-back pool balance
    BuyBack,
    /// List a member's unread notifications
    Notifications {
        #[arg(long)]
        user_id: i64,
    },
}

#[derive(Debug, Args)]
pub struct MembershipArgs {
    #[arg(long)]
    pub user_id: i64,
    #[arg(long)]
    pub package_id: i64,
    /// Palliative track: car, house, land, business, education or solar
    #[arg(long)]
    pub palliative: Option<PalliativeOption>,
    /// Payment reference, also used to derive ledger references
    #[arg(long)]
    pub reference: String,
    #[arg(long, default_value = "Wallet")]
    pub method: String,
    /// Run the workflow and roll it back instead of committing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct RenewArgs {
    #[arg(long)]
    pub user_id: i64,
    #[arg(long)]
    pub reference: String,
    #[arg(long, default_value = "Wallet")]
    pub method: String,
    #[arg(long)]
    pub dry_run: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn notification_service(pool: &PgPool) -> NotificationService {
    NotificationService::new(Arc::new(PgNotifier::new(pool.clone())))
}

/// Commits on success (unless dry-running) and rolls back on any error.
///
/// Queued notifications go out only after the commit has succeeded; a
/// rollback or dry run discards them.
async fn finish<T: Serialize>(
    store: PgMembershipStore<'_>,
    outcome: RewardResult<T>,
    dry_run: bool,
    notifications: &NotificationService,
) -> Result<()> {
    match outcome {
        Ok(summary) => {
            if dry_run {
                store.rollback().await?;
                tracing::info!("Dry run: all changes rolled back, no notifications sent");
            } else {
                let pending = store.commit().await?;
                notifications.deliver(pending).await;
            }
            print_json(&summary)
        }
        Err(e) => {
            store.rollback().await?;
            if e.is_consistency() {
                tracing::error!("Consistency failure, nothing was written: {}", e);
            }
            Err(e.into())
        }
    }
}

pub async fn run(cli: Cli, config: RewardsConfig) -> Result<()> {
    let pool = init_db(&config.database_url, config.max_connections).await?;
    let service = MembershipService::new(config.policy.clone());
    let notifications = notification_service(&pool);

    match cli.command {
        Command::Migrate => {
            bpi_db::migrate(&pool).await?;
            println!("Migrations applied.");
        }
        Command::Activate(args) => {
            let mut store = PgMembershipStore::begin(&pool).await?;
            let outcome = service
                .activate(
                    &mut store,
                    ActivationRequest {
                        user_id: args.user_id,
                        package_id: args.package_id,
                        selected_palliative: args.palliative,
                        payment_reference: args.reference,
                        payment_method_label: args.method,
                    },
                )
                .await;
            finish(store, outcome, args.dry_run, &notifications).await?;
        }
        Command::Upgrade(args) => {
            let mut store = PgMembershipStore::begin(&pool).await?;
            let outcome = service
                .upgrade(
                    &mut store,
                    UpgradeRequest {
                        user_id: args.user_id,
                        package_id: args.package_id,
                        selected_palliative: args.palliative,
                        payment_reference: args.reference,
                        payment_method_label: args.method,
                    },
                )
                .await;
            finish(store, outcome, args.dry_run, &notifications).await?;
        }
        Command::Renew(args) => {
            let mut store = PgMembershipStore::begin(&pool).await?;
            let outcome = service
                .renew(
                    &mut store,
                    RenewalRequest {
                        user_id: args.user_id,
                        payment_reference: args.reference,
                        payment_method_label: args.method,
                    },
                )
                .await;
            finish(store, outcome, args.dry_run, &notifications).await?;
        }
        Command::Status { user_id } => {
            let mut store = PgMembershipStore::begin(&pool).await?;
            let status = service.membership_status(&mut store, user_id).await;
            store.rollback().await?;
            print_json(&status?)?;
        }
        Command::Chain { user_id, levels } => {
            let mut store = PgMembershipStore::begin(&pool).await?;
            let chain = ReferralService::get_referral_chain(&mut store, user_id, levels).await;
            store.rollback().await?;
            print_json(&chain?)?;
        }
        Command::History { user_id, limit } => {
            let mut conn = pool.acquire().await.context("Failed to acquire connection")?;
            let transactions = TransactionRepository::list_for_user(&mut conn, user_id, limit).await?;
            let tokens = TokenTransactionRepository::list_for_user(&mut conn, user_id, limit).await?;
            print_json(&serde_json::json!({
                "transactions": transactions,
                "token_transactions": tokens,
            }))?;
        }
        Command::Packages => {
            let mut conn = pool.acquire().await.context("Failed to acquire connection")?;
            print_json(&PackageRepository::get_active(&mut conn).await?)?;
        }
        Command::BuyBack => {
            let mut conn = pool.acquire().await.context("Failed to acquire connection")?;
            let wallet = SystemWalletRepository::get(&mut conn, BUY_BACK_WALLET).await?;
            print_json(&wallet)?;
        }
        Command::Notifications { user_id } => {
            let repo = NotificationRepository::new(pool.clone());
            print_json(&repo.get_unread(user_id).await?)?;
        }
    }

    Ok(())
}
