use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const BUY_BACK_WALLET: &str = "BUY_BACK";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemWallet {
    pub id: i64,
    pub wallet_type: String,
    pub balance: f64,
    pub updated_at: DateTime<Utc>,
}
