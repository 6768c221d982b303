use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Palliative track a member can direct their palliative rewards into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PalliativeOption {
    Car,
    House,
    Land,
    Business,
    Education,
    Solar,
}

impl PalliativeOption {
    pub const ALL: [PalliativeOption; 6] = [
        PalliativeOption::Car,
        PalliativeOption::House,
        PalliativeOption::Land,
        PalliativeOption::Business,
        PalliativeOption::Education,
        PalliativeOption::Solar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PalliativeOption::Car => "car",
            PalliativeOption::House => "house",
            PalliativeOption::Land => "land",
            PalliativeOption::Business => "business",
            PalliativeOption::Education => "education",
            PalliativeOption::Solar => "solar",
        }
    }

    /// Column on `users` holding this track's sub-wallet.
    pub fn wallet_column(&self) -> &'static str {
        match self {
            PalliativeOption::Car => "car_wallet",
            PalliativeOption::House => "house_wallet",
            PalliativeOption::Land => "land_wallet",
            PalliativeOption::Business => "business_wallet",
            PalliativeOption::Education => "education_wallet",
            PalliativeOption::Solar => "solar_wallet",
        }
    }
}

impl fmt::Display for PalliativeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PalliativeOption {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        PalliativeOption::ALL
            .into_iter()
            .find(|opt| opt.as_str() == needle)
            .ok_or_else(|| UnknownVariant {
                kind: "palliative option",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PalliativeTier {
    Regular,
    Higher,
}

impl PalliativeTier {
    pub fn from_price(price: f64, higher_tier_min_price: f64) -> Self {
        if price >= higher_tier_min_price {
            PalliativeTier::Higher
        } else {
            PalliativeTier::Regular
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PalliativeTier::Regular => "regular",
            PalliativeTier::Higher => "higher",
        }
    }
}

impl FromStr for PalliativeTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(PalliativeTier::Regular),
            "higher" => Ok(PalliativeTier::Higher),
            _ => Err(UnknownVariant {
                kind: "palliative tier",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPalliativeActivation {
    pub user_id: i64,
    pub palliative: PalliativeOption,
    pub package_id: i64,
    pub activated_at: DateTime<Utc>,
}
