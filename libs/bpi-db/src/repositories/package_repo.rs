use anyhow::{Context, Result};
use sqlx::PgConnection;

use crate::models::package::{MembershipPackage, PackageRow};

pub struct PackageRepository;

impl PackageRepository {
    pub async fn get_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<MembershipPackage>> {
        let row = sqlx::query_as::<_, PackageRow>("SELECT * FROM membership_packages WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .context("Failed to fetch membership package")?;
        Ok(row.map(MembershipPackage::from))
    }

    pub async fn get_active(conn: &mut PgConnection) -> Result<Vec<MembershipPackage>> {
        let rows = sqlx::query_as::<_, PackageRow>(
            "SELECT * FROM membership_packages WHERE is_active = TRUE ORDER BY price ASC",
        )
        .fetch_all(conn)
        .await
        .context("Failed to fetch active packages")?;
        Ok(rows.into_iter().map(MembershipPackage::from).collect())
    }
}
