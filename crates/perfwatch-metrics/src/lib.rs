pub mod alert;
pub mod application;
pub mod collector;
pub mod health;
pub mod notifier;
pub mod optimizer;
pub mod system;
pub mod thresholds;

pub use alert::{Clock, ManualClock, SystemClock, ThresholdEvaluator, DEFAULT_COOLDOWN_MINUTES};
pub use application::{ApiProbe, ApplicationCollector, ApplicationCollectorConfig, ProbeMethod};
pub use collector::{Collector, CollectorError};
pub use health::HealthAggregator;
pub use notifier::{AlertNotifier, FnNotifier, LogNotifier, NotifierError, WebhookNotifier};
pub use optimizer::PerformanceOptimizer;
pub use system::{SystemCollector, SystemCollectorConfig};
pub use thresholds::{Threshold, ThresholdTable};
