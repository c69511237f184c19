pub mod db;
pub mod error;
pub mod sqlite;
pub mod store;

pub use db::{performance_alert, performance_metric, system_health};
pub use error::{Result, StoreError};
pub use sqlite::SqliteMetricStore;
pub use store::MetricStore;
