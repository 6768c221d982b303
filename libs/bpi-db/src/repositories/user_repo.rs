use anyhow::{Context, Result};
use sqlx::{PgConnection, Row, postgres::PgRow};

use crate::models::palliative::{PalliativeOption, PalliativeTier};
use crate::models::user::{MembershipUpdate, User, WalletBalances, WalletKind};

pub struct UserRepository;

impl UserRepository {
    fn row_to_user(row: &PgRow) -> Result<User> {
        let selected_palliative = row
            .try_get::<Option<String>, _>("selected_palliative")?
            .and_then(|raw| match raw.parse::<PalliativeOption>() {
                Ok(option) => Some(option),
                Err(e) => {
                    tracing::warn!("Ignoring stored palliative selection: {}", e);
                    None
                }
            });
        let palliative_tier = row
            .try_get::<Option<String>, _>("palliative_tier")?
            .and_then(|raw| raw.parse::<PalliativeTier>().ok());

        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            referrer_id: row.try_get("referrer_id")?,
            balances: WalletBalances {
                wallet: row.try_get("wallet")?,
                spendable: row.try_get("spendable")?,
                palliative: row.try_get("palliative")?,
                cashback: row.try_get("cashback")?,
                bpi_token_wallet: row.try_get("bpi_token_wallet")?,
                social_media: row.try_get("social_media")?,
                car_wallet: row.try_get("car_wallet")?,
                house_wallet: row.try_get("house_wallet")?,
                land_wallet: row.try_get("land_wallet")?,
                business_wallet: row.try_get("business_wallet")?,
                education_wallet: row.try_get("education_wallet")?,
                solar_wallet: row.try_get("solar_wallet")?,
            },
            active_membership_package_id: row.try_get("active_membership_package_id")?,
            membership_activated_at: row.try_get("membership_activated_at")?,
            membership_expires_at: row.try_get("membership_expires_at")?,
            palliative_activated: row.try_get("palliative_activated")?,
            selected_palliative,
            palliative_tier,
            myngul_activation_pin: row.try_get("myngul_activation_pin")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub async fn get_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .context("Failed to fetch user by ID")?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Locks the row for the rest of the transaction.
    pub async fn get_for_update(conn: &mut PgConnection, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .context("Failed to lock user row")?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    pub async fn get_referrer_id(conn: &mut PgConnection, id: i64) -> Result<Option<i64>> {
        let referrer: Option<Option<i64>> =
            sqlx::query_scalar("SELECT referrer_id FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to fetch referrer")?;
        Ok(referrer.flatten())
    }

    pub async fn increment_wallet(
        conn: &mut PgConnection,
        id: i64,
        wallet: WalletKind,
        amount: f64,
    ) -> Result<()> {
        // Column names come from the closed WalletKind set, never from input.
        let column = wallet.column();
        let sql = format!("UPDATE users SET {column} = {column} + $1 WHERE id = $2");
        let result = sqlx::query(&sql)
            .bind(amount)
            .bind(id)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to credit {} for user {}", column, id))?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("User {} not found while crediting {}", id, column));
        }
        Ok(())
    }

    pub async fn update_membership(
        conn: &mut PgConnection,
        id: i64,
        update: &MembershipUpdate,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                active_membership_package_id = $1,
                membership_activated_at = $2,
                membership_expires_at = $3,
                palliative_activated = $4,
                selected_palliative = $5,
                palliative_tier = $6,
                myngul_activation_pin = COALESCE($7, myngul_activation_pin)
            WHERE id = $8
            "#,
        )
        .bind(update.package_id)
        .bind(update.activated_at)
        .bind(update.expires_at)
        .bind(update.palliative_activated)
        .bind(update.selected_palliative.map(|p| p.as_str()))
        .bind(update.palliative_tier.as_str())
        .bind(update.myngul_activation_pin.as_deref())
        .bind(id)
        .execute(conn)
        .await
        .context("Failed to update membership")?;
        Ok(())
    }

    pub async fn update_expiry(
        conn: &mut PgConnection,
        id: i64,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET membership_expires_at = $1 WHERE id = $2")
            .bind(expires_at)
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update membership expiry")?;
        Ok(())
    }
}
