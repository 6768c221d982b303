pub mod ledger;
pub mod notification;
pub mod package;
pub mod palliative;
pub mod system_wallet;
pub mod user;
