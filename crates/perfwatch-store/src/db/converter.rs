use crate::error::{Result, StoreError};
use perfwatch_types::{
    Alert, AlertSeverity, AlertType, HealthSnapshot, HealthStatus, MetricSample, PerformanceGrade,
};
use sea_orm::ActiveValue::{NotSet, Set};
use serde_json::Value as JsonValue;

/// MetricSample 与数据库实体的转换
impl From<MetricSample> for super::performance_metric::ActiveModel {
    fn from(sample: MetricSample) -> Self {
        Self {
            id: NotSet,
            timestamp: Set(sample.timestamp),
            metric_name: Set(sample.name),
            value: Set(sample.value),
            unit: Set(sample.unit),
            threshold_warning: Set(sample.threshold_warning),
            threshold_critical: Set(sample.threshold_critical),
            metadata: Set(sample.metadata),
        }
    }
}

impl From<super::performance_metric::Model> for MetricSample {
    fn from(model: super::performance_metric::Model) -> Self {
        Self {
            timestamp: model.timestamp,
            name: model.metric_name,
            value: model.value,
            unit: model.unit,
            threshold_warning: model.threshold_warning,
            threshold_critical: model.threshold_critical,
            metadata: model.metadata,
        }
    }
}

/// Alert 与数据库实体的转换
impl From<Alert> for super::performance_alert::ActiveModel {
    fn from(alert: Alert) -> Self {
        Self {
            id: NotSet,
            timestamp: Set(alert.timestamp),
            alert_type: Set(alert.alert_type.as_str().to_string()),
            metric_name: Set(alert.metric_name),
            current_value: Set(alert.current_value),
            threshold: Set(alert.threshold),
            message: Set(alert.message),
            severity: Set(alert.severity.as_str().to_string()),
            resolved: Set(alert.resolved),
            resolved_at: Set(alert.resolved_at),
        }
    }
}

impl TryFrom<super::performance_alert::Model> for Alert {
    type Error = StoreError;

    fn try_from(model: super::performance_alert::Model) -> Result<Self> {
        let alert_type = AlertType::from_str(&model.alert_type).ok_or_else(|| {
            StoreError::invalid_data(format!("unknown alert type '{}'", model.alert_type))
        })?;
        let severity = AlertSeverity::from_str(&model.severity).ok_or_else(|| {
            StoreError::invalid_data(format!("unknown severity '{}'", model.severity))
        })?;

        Ok(Self {
            timestamp: model.timestamp,
            alert_type,
            metric_name: model.metric_name,
            current_value: model.current_value,
            threshold: model.threshold,
            message: model.message,
            severity,
            resolved: model.resolved,
            resolved_at: model.resolved_at,
        })
    }
}

/// HealthSnapshot 与数据库实体的转换
impl TryFrom<HealthSnapshot> for super::system_health::ActiveModel {
    type Error = StoreError;

    fn try_from(snapshot: HealthSnapshot) -> Result<Self> {
        Ok(Self {
            id: NotSet,
            timestamp: Set(snapshot.timestamp),
            health_score: Set(snapshot.health_score),
            status: Set(snapshot.status.as_str().to_string()),
            active_alerts: Set(i32::try_from(snapshot.active_alerts).unwrap_or(i32::MAX)),
            performance_grade: Set(snapshot.performance_grade.as_str().to_string()),
            bottlenecks: Set(strings_to_json(&snapshot.bottlenecks)?),
            recommendations: Set(strings_to_json(&snapshot.recommendations)?),
        })
    }
}

impl TryFrom<super::system_health::Model> for HealthSnapshot {
    type Error = StoreError;

    fn try_from(model: super::system_health::Model) -> Result<Self> {
        let status = HealthStatus::from_str(&model.status)
            .ok_or_else(|| StoreError::invalid_data(format!("unknown status '{}'", model.status)))?;
        let performance_grade = PerformanceGrade::from_str(&model.performance_grade)
            .ok_or_else(|| {
                StoreError::invalid_data(format!("unknown grade '{}'", model.performance_grade))
            })?;

        Ok(Self {
            timestamp: model.timestamp,
            health_score: model.health_score,
            status,
            active_alerts: u32::try_from(model.active_alerts).unwrap_or(0),
            performance_grade,
            bottlenecks: json_to_strings(model.bottlenecks)?,
            recommendations: json_to_strings(model.recommendations)?,
        })
    }
}

fn strings_to_json(items: &[String]) -> Result<JsonValue> {
    Ok(serde_json::to_value(items)?)
}

fn json_to_strings(value: JsonValue) -> Result<Vec<String>> {
    match value {
        JsonValue::Null => Ok(Vec::new()),
        other => Ok(serde_json::from_value(other)?),
    }
}
