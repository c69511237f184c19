use perfwatch_types::MetricSample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单个指标的告警/严重阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default)]
    pub warning: Option<f64>,
    #[serde(default)]
    pub critical: Option<f64>,
}

impl Threshold {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self {
            warning: Some(warning),
            critical: Some(critical),
        }
    }
}

const DEFAULT_THRESHOLDS: &[(&str, Threshold)] = &[
    ("cpu_usage", Threshold::new(70.0, 85.0)),
    ("memory_usage", Threshold::new(75.0, 90.0)),
    ("disk_usage", Threshold::new(80.0, 95.0)),
    ("disk_io_latency", Threshold::new(100.0, 500.0)),
    ("network_latency", Threshold::new(200.0, 1000.0)),
    ("load_average", Threshold::new(2.0, 5.0)),
    ("script_execution_time", Threshold::new(30.0, 60.0)),
    ("api_response_time", Threshold::new(2000.0, 5000.0)),
    ("memory_usage_mb", Threshold::new(512.0, 1024.0)),
    ("error_rate", Threshold::new(5.0, 10.0)),
];

/// 静态阈值表
///
/// 键是指标族名：脚本与 API 指标按族共享阈值
/// （`script_execution_time`、`api_response_time`）。
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    entries: HashMap<String, Threshold>,
}

impl ThresholdTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 在默认表上覆盖配置项
    pub fn with_overrides(overrides: &HashMap<String, Threshold>) -> Self {
        let mut table = Self::default();
        for (name, threshold) in overrides {
            table.entries.insert(name.clone(), *threshold);
        }
        table
    }

    pub fn set(&mut self, family: impl Into<String>, threshold: Threshold) {
        self.entries.insert(family.into(), threshold);
    }

    pub fn get(&self, family: &str) -> Option<Threshold> {
        self.entries.get(family).copied()
    }

    /// 为采样填入阈值；表中没有该族时保持无阈值
    pub fn apply(&self, family: &str, sample: MetricSample) -> MetricSample {
        match self.get(family) {
            Some(t) => sample.with_thresholds(t.warning, t.critical),
            None => sample,
        }
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_THRESHOLDS
                .iter()
                .map(|(name, threshold)| (name.to_string(), *threshold))
                .collect(),
        }
    }
}
