pub mod db;
pub mod models;

pub use db::{Adjustment, PointsStore};
pub use models::{BalancePolicy, PointsStats, Scope, UserAccount};
