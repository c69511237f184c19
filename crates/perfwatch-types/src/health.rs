use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Good,
    Degraded,
    Poor,
    Critical,
}

/// 性能等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceGrade {
    A,
    B,
    C,
    D,
    F,
}

impl HealthStatus {
    /// 根据健康分数计算状态与等级
    pub fn from_score(score: f64) -> (HealthStatus, PerformanceGrade) {
        if score >= 90.0 {
            (HealthStatus::Healthy, PerformanceGrade::A)
        } else if score >= 75.0 {
            (HealthStatus::Good, PerformanceGrade::B)
        } else if score >= 60.0 {
            (HealthStatus::Degraded, PerformanceGrade::C)
        } else if score >= 40.0 {
            (HealthStatus::Poor, PerformanceGrade::D)
        } else {
            (HealthStatus::Critical, PerformanceGrade::F)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Good => "good",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "healthy" => Some(HealthStatus::Healthy),
            "good" => Some(HealthStatus::Good),
            "degraded" => Some(HealthStatus::Degraded),
            "poor" => Some(HealthStatus::Poor),
            "critical" => Some(HealthStatus::Critical),
            _ => None,
        }
    }
}

impl PerformanceGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceGrade::A => "A",
            PerformanceGrade::B => "B",
            PerformanceGrade::C => "C",
            PerformanceGrade::D => "D",
            PerformanceGrade::F => "F",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "A" => Some(PerformanceGrade::A),
            "B" => Some(PerformanceGrade::B),
            "C" => Some(PerformanceGrade::C),
            "D" => Some(PerformanceGrade::D),
            "F" => Some(PerformanceGrade::F),
            _ => None,
        }
    }
}

/// 一个监控周期的综合健康快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,

    /// 0-100
    pub health_score: f64,
    pub status: HealthStatus,

    /// 本周期产生的告警数
    pub active_alerts: u32,
    pub performance_grade: PerformanceGrade,
    pub bottlenecks: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoints_are_exact() {
        assert_eq!(
            HealthStatus::from_score(90.0),
            (HealthStatus::Healthy, PerformanceGrade::A)
        );
        assert_eq!(
            HealthStatus::from_score(89.9),
            (HealthStatus::Good, PerformanceGrade::B)
        );
        assert_eq!(
            HealthStatus::from_score(75.0),
            (HealthStatus::Good, PerformanceGrade::B)
        );
        assert_eq!(
            HealthStatus::from_score(60.0),
            (HealthStatus::Degraded, PerformanceGrade::C)
        );
        assert_eq!(
            HealthStatus::from_score(40.0),
            (HealthStatus::Poor, PerformanceGrade::D)
        );
        assert_eq!(
            HealthStatus::from_score(0.0),
            (HealthStatus::Critical, PerformanceGrade::F)
        );
    }
}
