use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("Membership package {0} not found")]
    PackageNotFound(i64),

    #[error("Membership package '{0}' is no longer offered")]
    PackageInactive(String),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("BPT reward must be positive, got {0}")]
    NonPositiveReward(f64),

    #[error("Package '{package}' requires a palliative selection")]
    PalliativeSelectionRequired { package: String },

    #[error("Upgrade from '{from}' to '{to}' costs {cost}; only upgrades to a higher package are allowed")]
    NonPositiveUpgradeCost { from: String, to: String, cost: f64 },

    #[error("User {0} has no active membership")]
    NoActiveMembership(i64),

    #[error("BPT split mismatch: {user_share} + {buy_back} != {total}")]
    SplitMismatch {
        total: f64,
        user_share: f64,
        buy_back: f64,
    },

    #[error("BPT balance of user {user_id} would become negative ({balance})")]
    NegativeBalance { user_id: i64, balance: f64 },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl RewardError {
    /// Bad input or unmet precondition; surfaced to the caller as a user-facing failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RewardError::PackageNotFound(_)
                | RewardError::PackageInactive(_)
                | RewardError::UserNotFound(_)
                | RewardError::NonPositiveReward(_)
                | RewardError::PalliativeSelectionRequired { .. }
                | RewardError::NonPositiveUpgradeCost { .. }
                | RewardError::NoActiveMembership(_)
        )
    }

    /// Computational or data-corruption fault. Never retried.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            RewardError::SplitMismatch { .. } | RewardError::NegativeBalance { .. }
        )
    }
}

pub type RewardResult<T> = std::result::Result<T, RewardError>;
