use anyhow::{Context, Result};
use sqlx::PgConnection;

use crate::models::palliative::NewPalliativeActivation;

pub struct PalliativeActivationRepository;

impl PalliativeActivationRepository {
    pub async fn record(conn: &mut PgConnection, activation: &NewPalliativeActivation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO palliative_wallet_activations (user_id, palliative_type, package_id, activated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                palliative_type = excluded.palliative_type,
                package_id = excluded.package_id,
                activated_at = excluded.activated_at
            "#,
        )
        .bind(activation.user_id)
        .bind(activation.palliative.as_str())
        .bind(activation.package_id)
        .bind(activation.activated_at)
        .execute(conn)
        .await
        .context("Failed to record palliative wallet activation")?;
        Ok(())
    }
}
