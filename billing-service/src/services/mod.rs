pub mod billing;
pub mod database;
pub mod metrics;

pub use billing::BillingError;
pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
