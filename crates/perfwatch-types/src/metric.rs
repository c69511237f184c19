use crate::alert::AlertType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单次指标采样
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// 采样时间
    pub timestamp: DateTime<Utc>,

    /// 指标名称，如 `cpu_usage`、`api_response_time_linear`
    pub name: String,

    /// 采样值
    pub value: f64,

    /// 展示单位（percent / ms / MB / ratio / seconds），不参与比较
    pub unit: String,

    /// 告警阈值
    pub threshold_warning: Option<f64>,

    /// 严重阈值
    pub threshold_critical: Option<f64>,

    /// 附加上下文，评估器不解析
    pub metadata: Option<serde_json::Value>,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            name: name.into(),
            value,
            unit: unit.into(),
            threshold_warning: None,
            threshold_critical: None,
            metadata: None,
        }
    }

    pub fn with_thresholds(mut self, warning: Option<f64>, critical: Option<f64>) -> Self {
        self.threshold_warning = warning;
        self.threshold_critical = critical;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 按阈值分类：先判断严重阈值，再判断告警阈值
    pub fn breach(&self) -> Option<AlertType> {
        if matches!(self.threshold_critical, Some(critical) if self.value >= critical) {
            return Some(AlertType::Critical);
        }
        if matches!(self.threshold_warning, Some(warning) if self.value >= warning) {
            return Some(AlertType::Warning);
        }
        None
    }
}
