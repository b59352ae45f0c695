pub mod accounts;
pub mod database;

pub use accounts::{AccountStore, SqliteAccountStore, User, UserAnalysis};
pub use database::{Database, PoolConfig, SharedDatabase};
