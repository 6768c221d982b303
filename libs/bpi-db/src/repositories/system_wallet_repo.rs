use anyhow::{Context, Result};
use sqlx::PgConnection;

use crate::models::system_wallet::SystemWallet;

pub struct SystemWalletRepository;

impl SystemWalletRepository {
    /// Adds `amount` to the wallet, creating it on first use, and returns the new balance.
    pub async fn increment(conn: &mut PgConnection, wallet_type: &str, amount: f64) -> Result<f64> {
        sqlx::query_scalar::<_, f64>(
            r#"
            INSERT INTO system_wallets (wallet_type, balance, updated_at)
            VALUES ($1, $2, CURRENT_TIMESTAMP)
            ON CONFLICT (wallet_type) DO UPDATE SET
                balance = system_wallets.balance + excluded.balance,
                updated_at = CURRENT_TIMESTAMP
            RETURNING balance
            "#,
        )
        .bind(wallet_type)
        .bind(amount)
        .fetch_one(conn)
        .await
        .with_context(|| format!("Failed to credit system wallet {}", wallet_type))
    }

    pub async fn get(conn: &mut PgConnection, wallet_type: &str) -> Result<Option<SystemWallet>> {
        sqlx::query_as::<_, SystemWallet>("SELECT * FROM system_wallets WHERE wallet_type = $1")
            .bind(wallet_type)
            .fetch_optional(conn)
            .await
            .context("Failed to fetch system wallet")
    }
}
