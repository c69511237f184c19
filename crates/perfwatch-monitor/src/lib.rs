pub mod config;
pub mod logging;
pub mod report;
pub mod service;

pub use config::MonitorConfig;
pub use logging::{init_tracing, LogFormat};
pub use report::{generate_report, KEY_METRICS};
pub use service::{CycleOutcome, LoopState, MonitorService};
