use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use bpi_db::models::package::{MembershipPackage, REWARD_LEVELS};
use bpi_db::models::palliative::PalliativeTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub policy: RewardPolicy,
}

/// Business rules the membership workflows apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    pub max_referral_levels: usize,
    pub membership_days: i64,
    /// Packages (by name) that require a palliative selection.
    pub high_tier_packages: Vec<String>,
    pub higher_tier_min_price: f64,
    /// Packages (by name) bundled with a MYNGUL social media credit.
    pub myngul_packages: Vec<String>,
    pub myngul_credit: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            max_referral_levels: REWARD_LEVELS,
            membership_days: 365,
            high_tier_packages: vec!["Gold Plus".to_string(), "Platinum Plus".to_string()],
            higher_tier_min_price: 200_000.0,
            myngul_packages: vec![
                "Regular Plus".to_string(),
                "Gold Plus".to_string(),
                "Platinum Plus".to_string(),
            ],
            myngul_credit: 11_000.0,
        }
    }
}

fn name_matches(list: &[String], name: &str) -> bool {
    let name = name.trim();
    list.iter().any(|candidate| candidate.trim().eq_ignore_ascii_case(name))
}

impl RewardPolicy {
    pub fn is_high_tier(&self, package: &MembershipPackage) -> bool {
        name_matches(&self.high_tier_packages, &package.name)
    }

    pub fn is_myngul_package(&self, package: &MembershipPackage) -> bool {
        name_matches(&self.myngul_packages, &package.name)
    }

    pub fn palliative_tier(&self, package: &MembershipPackage) -> PalliativeTier {
        PalliativeTier::from_price(package.price, self.higher_tier_min_price)
    }

    pub fn referral_levels(&self) -> usize {
        self.max_referral_levels.min(REWARD_LEVELS)
    }
}

fn default_max_connections() -> u32 {
    10
}

impl RewardsConfig {
    pub fn load() -> Result<Self> {
        let config_paths = ["/etc/bpi/rewards.toml", "./rewards.toml"];

        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                tracing::info!("Loading config from {}", path);
                return Self::from_toml(&contents)
                    .with_context(|| format!("Invalid config file {}", path));
            }
        }

        tracing::info!("Loading config from environment");
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_connections),
            policy: RewardPolicy::default(),
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
