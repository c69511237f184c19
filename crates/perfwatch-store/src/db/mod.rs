pub mod converter;
pub mod entity;
pub mod schema;

pub use entity::{performance_alert, performance_metric, system_health};
