use crate::health::HealthSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 指标走势（数值越低越好）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Degrading,
}

impl Trend {
    /// `newest_first` 按时间倒序排列
    pub fn from_values(newest_first: &[f64]) -> Self {
        match (newest_first.first(), newest_first.last()) {
            (Some(newest), Some(oldest)) if newest_first.len() > 1 => {
                if newest < oldest {
                    Trend::Improving
                } else if newest > oldest {
                    Trend::Degrading
                } else {
                    Trend::Stable
                }
            }
            _ => Trend::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub trend: Trend,
    pub data_points: usize,
}

impl MetricSummary {
    /// 空序列返回 `None`
    pub fn from_values(newest_first: &[f64]) -> Option<Self> {
        let current = *newest_first.first()?;
        let sum: f64 = newest_first.iter().sum();
        let min = newest_first.iter().copied().fold(f64::INFINITY, f64::min);
        let max = newest_first.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            current,
            average: sum / newest_first.len() as f64,
            min,
            max,
            trend: Trend::from_values(newest_first),
            data_points: newest_first.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_hours: u32,
}

/// 时间窗口内的性能报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub report_period: ReportPeriod,
    pub metrics_summary: BTreeMap<String, MetricSummary>,
    pub active_alerts: usize,
    pub system_health: Option<HealthSnapshot>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_statistics() {
        let summary = MetricSummary::from_values(&[40.0, 60.0, 80.0]).unwrap();
        assert_eq!(summary.current, 40.0);
        assert_eq!(summary.average, 60.0);
        assert_eq!(summary.min, 40.0);
        assert_eq!(summary.max, 80.0);
        assert_eq!(summary.data_points, 3);
        assert_eq!(summary.trend, Trend::Improving);
    }

    #[test]
    fn test_trend() {
        assert_eq!(Trend::from_values(&[90.0, 50.0]), Trend::Degrading);
        assert_eq!(Trend::from_values(&[50.0, 70.0, 50.0]), Trend::Stable);
        assert_eq!(Trend::from_values(&[50.0]), Trend::Stable);
        assert!(MetricSummary::from_values(&[]).is_none());
    }
}
