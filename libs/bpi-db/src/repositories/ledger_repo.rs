use anyhow::{Context, Result};
use sqlx::PgConnection;

use crate::models::ledger::{NewTokenTransaction, NewTransaction, TokenTransaction, Transaction};

/// Append-only access to `transactions`. Rows are never updated.
pub struct TransactionRepository;

impl TransactionRepository {
    pub async fn insert(conn: &mut PgConnection, tx: &NewTransaction) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO transactions (user_id, transaction_type, amount, description, status, reference)
            VALUES ($1, $2, $3, $4, 'completed', $5)
            RETURNING id
            "#,
        )
        .bind(tx.user_id)
        .bind(tx.transaction_type.as_str())
        .bind(tx.amount)
        .bind(&tx.description)
        .bind(&tx.reference)
        .fetch_one(conn)
        .await
        .with_context(|| format!("Failed to record transaction {}", tx.reference))
    }

    pub async fn list_for_user(
        conn: &mut PgConnection,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(conn)
        .await
        .context("Failed to fetch user transactions")
    }
}

/// Append-only access to `token_transactions`.
pub struct TokenTransactionRepository;

impl TokenTransactionRepository {
    pub async fn insert(conn: &mut PgConnection, tx: &NewTokenTransaction) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO token_transactions
                (user_id, transaction_type, source, gross_amount, amount, description, reference)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(tx.user_id)
        .bind(&tx.transaction_type)
        .bind(tx.source.as_str())
        .bind(tx.gross_amount)
        .bind(tx.amount)
        .bind(&tx.description)
        .bind(&tx.reference)
        .fetch_one(conn)
        .await
        .with_context(|| format!("Failed to record token transaction {}", tx.reference))
    }

    pub async fn list_for_user(
        conn: &mut PgConnection,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<TokenTransaction>> {
        sqlx::query_as::<_, TokenTransaction>(
            "SELECT * FROM token_transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(conn)
        .await
        .context("Failed to fetch user token transactions")
    }
}
