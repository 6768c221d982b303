use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Number of upline levels a package pays rewards to.
pub const REWARD_LEVELS: usize = 4;

/// Rewards paid to a single upline level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelRewards {
    pub cash: f64,
    pub palliative: f64,
    pub bpt: f64,
    pub cashback: f64,
}

impl LevelRewards {
    pub fn is_zero(&self) -> bool {
        self.cash <= 0.0 && self.palliative <= 0.0 && self.bpt <= 0.0 && self.cashback <= 0.0
    }

    /// Per-category difference `self - previous` in whole cents, keeping only increases.
    pub fn increase_over(&self, previous: &LevelRewards) -> LevelRewards {
        let delta = |new: f64, old: f64| (((new - old) * 100.0).round() / 100.0).max(0.0);
        LevelRewards {
            cash: delta(self.cash, previous.cash),
            palliative: delta(self.palliative, previous.palliative),
            bpt: delta(self.bpt, previous.bpt),
            cashback: delta(self.cashback, previous.cashback),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardTable {
    levels: [LevelRewards; REWARD_LEVELS],
}

impl RewardTable {
    pub fn new(levels: [LevelRewards; REWARD_LEVELS]) -> Self {
        Self { levels }
    }

    /// Rewards for a 1-based upline level. Levels past the table pay nothing.
    pub fn level(&self, level: usize) -> LevelRewards {
        level
            .checked_sub(1)
            .and_then(|idx| self.levels.get(idx))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipPackage {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub vat: f64,
    pub renewal_fee: Option<f64>,
    pub rewards: RewardTable,
    pub is_active: bool,
}

impl MembershipPackage {
    pub fn total_cost(&self) -> f64 {
        self.price + self.vat
    }

    pub fn renewal_cost(&self) -> f64 {
        self.renewal_fee.unwrap_or(self.price)
    }
}

/// Flat row as stored in `membership_packages`.
#[derive(Debug, Clone, FromRow)]
pub struct PackageRow {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub vat: f64,
    pub renewal_fee: Option<f64>,
    pub cash_l1: f64,
    pub cash_l2: f64,
    pub cash_l3: f64,
    pub cash_l4: f64,
    pub palliative_l1: f64,
    pub palliative_l2: f64,
    pub palliative_l3: f64,
    pub palliative_l4: f64,
    pub bpt_l1: f64,
    pub bpt_l2: f64,
    pub bpt_l3: f64,
    pub bpt_l4: f64,
    pub cashback_l1: f64,
    pub cashback_l2: f64,
    pub cashback_l3: f64,
    pub cashback_l4: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PackageRow> for MembershipPackage {
    fn from(row: PackageRow) -> Self {
        let level = |cash, palliative, bpt, cashback| LevelRewards {
            cash,
            palliative,
            bpt,
            cashback,
        };
        MembershipPackage {
            id: row.id,
            name: row.name,
            price: row.price,
            vat: row.vat,
            renewal_fee: row.renewal_fee,
            rewards: RewardTable::new([
                level(row.cash_l1, row.palliative_l1, row.bpt_l1, row.cashback_l1),
                level(row.cash_l2, row.palliative_l2, row.bpt_l2, row.cashback_l2),
                level(row.cash_l3, row.palliative_l3, row.bpt_l3, row.cashback_l3),
                level(row.cash_l4, row.palliative_l4, row.bpt_l4, row.cashback_l4),
            ]),
            is_active: row.is_active,
        }
    }
}
