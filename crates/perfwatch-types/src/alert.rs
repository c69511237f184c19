use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Warning,
    Critical,
    Recovery,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Warning => "warning",
            AlertType::Critical => "critical",
            AlertType::Recovery => "recovery",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(AlertType::Warning),
            "critical" => Some(AlertType::Critical),
            "recovery" => Some(AlertType::Recovery),
            _ => None,
        }
    }

    /// 对应的告警级别
    pub fn severity(&self) -> AlertSeverity {
        match self {
            AlertType::Warning => AlertSeverity::Warning,
            AlertType::Critical => AlertSeverity::Critical,
            AlertType::Recovery => AlertSeverity::Info,
        }
    }
}

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "info" => Some(AlertSeverity::Info),
            "warning" => Some(AlertSeverity::Warning),
            "critical" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// 阈值越界或恢复事件
///
/// 告警创建后不再修改；恢复是一条新的记录（`resolved = true`），
/// 通过 `metric_name` 与原告警关联。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub alert_type: AlertType,
    pub metric_name: String,
    pub current_value: f64,
    pub threshold: f64,
    pub message: String,
    pub severity: AlertSeverity,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        metric_name: impl Into<String>,
        current_value: f64,
        threshold: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            alert_type,
            metric_name: metric_name.into(),
            current_value,
            threshold,
            message: message.into(),
            severity: alert_type.severity(),
            resolved: false,
            resolved_at: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        if self.resolved {
            self.resolved_at = Some(timestamp);
        }
        self
    }

    /// 标记为已恢复（恢复告警在创建时即解决）
    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self.resolved_at = Some(self.timestamp);
        self
    }

    /// 冷却键：`metric:type`
    pub fn cooldown_key(&self) -> String {
        format!("{}:{}", self.metric_name, self.alert_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_is_info_and_resolved() {
        let alert = Alert::new(AlertType::Recovery, "cpu_usage", 40.0, 70.0, "recovered").resolved();
        assert_eq!(alert.severity, AlertSeverity::Info);
        assert!(alert.resolved);
        assert_eq!(alert.resolved_at, Some(alert.timestamp));
    }

    #[test]
    fn test_string_round_trip() {
        for t in [AlertType::Warning, AlertType::Critical, AlertType::Recovery] {
            assert_eq!(AlertType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(AlertSeverity::from_str("bogus"), None);
        assert_eq!(
            serde_json::to_string(&AlertSeverity::Critical).unwrap(),
            "\"critical\""
        );
    }
}
