pub mod alert;
pub mod health;
pub mod metric;
pub mod report;

pub use alert::{Alert, AlertSeverity, AlertType};
pub use health::{HealthSnapshot, HealthStatus, PerformanceGrade};
pub use metric::MetricSample;
pub use report::{MetricSummary, PerformanceReport, ReportPeriod, Trend};
