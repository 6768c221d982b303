pub mod ledger_repo;
pub mod notification_repo;
pub mod package_repo;
pub mod palliative_repo;
pub mod system_wallet_repo;
pub mod user_repo;
