use chrono::{DateTime, Utc};
use perfwatch_types::{Alert, AlertSeverity, AlertType, HealthSnapshot, HealthStatus, MetricSample};

const CRITICAL_SAMPLE_PENALTY: f64 = 20.0;
const WARNING_SAMPLE_PENALTY: f64 = 10.0;
const CRITICAL_ALERT_PENALTY: f64 = 15.0;
const WARNING_ALERT_PENALTY: f64 = 5.0;
const CAPACITY_REVIEW_BELOW: f64 = 80.0;

/// 健康度聚合器
///
/// 纯函数：同样的采样与告警总是得到同样的快照。
pub struct HealthAggregator;

impl HealthAggregator {
    pub fn compute(samples: &[MetricSample], alerts: &[Alert]) -> HealthSnapshot {
        Self::compute_at(samples, alerts, Utc::now())
    }

    pub fn compute_at(
        samples: &[MetricSample],
        alerts: &[Alert],
        timestamp: DateTime<Utc>,
    ) -> HealthSnapshot {
        let mut score = 100.0;
        let mut bottlenecks = Vec::new();

        for sample in samples {
            match sample.breach() {
                Some(AlertType::Critical) => {
                    score -= CRITICAL_SAMPLE_PENALTY;
                    bottlenecks.push(format!(
                        "{} is critical ({:.1} {})",
                        sample.name, sample.value, sample.unit
                    ));
                }
                Some(_) => {
                    score -= WARNING_SAMPLE_PENALTY;
                    bottlenecks.push(format!(
                        "{} is elevated ({:.1} {})",
                        sample.name, sample.value, sample.unit
                    ));
                }
                None => {}
            }
        }

        let critical_alerts = alerts
            .iter()
            .filter(|a| a.severity == AlertSeverity::Critical)
            .count();
        let warning_alerts = alerts
            .iter()
            .filter(|a| a.severity == AlertSeverity::Warning)
            .count();

        score -= CRITICAL_ALERT_PENALTY * critical_alerts as f64;
        score -= WARNING_ALERT_PENALTY * warning_alerts as f64;
        let score = score.clamp(0.0, 100.0);

        let (status, performance_grade) = HealthStatus::from_score(score);

        let mut recommendations = Vec::new();
        if !bottlenecks.is_empty() {
            recommendations.push("Address performance bottlenecks identified".to_string());
        }
        if critical_alerts > 0 {
            recommendations.push("Immediately resolve critical performance alerts".to_string());
        }
        if score < CAPACITY_REVIEW_BELOW {
            recommendations.push("Review system capacity and resource allocation".to_string());
        }

        HealthSnapshot {
            timestamp,
            health_score: score,
            status,
            active_alerts: u32::try_from(alerts.len()).unwrap_or(u32::MAX),
            performance_grade,
            bottlenecks,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfwatch_types::PerformanceGrade;

    fn sample(name: &str, value: f64) -> MetricSample {
        MetricSample::new(name, value, "percent").with_thresholds(Some(70.0), Some(85.0))
    }

    fn critical_alert(name: &str) -> Alert {
        Alert::new(AlertType::Critical, name, 92.0, 85.0, format!("{} is critically high", name))
    }

    #[test]
    fn test_all_in_range_is_healthy() {
        let samples = vec![sample("cpu_usage", 10.0), sample("memory_usage", 20.0), sample("disk_usage", 30.0)];
        let snapshot = HealthAggregator::compute(&samples, &[]);

        assert_eq!(snapshot.health_score, 100.0);
        assert_eq!(snapshot.status, HealthStatus::Healthy);
        assert_eq!(snapshot.performance_grade, PerformanceGrade::A);
        assert!(snapshot.bottlenecks.is_empty());
        assert!(snapshot.recommendations.is_empty());
        assert_eq!(snapshot.active_alerts, 0);
    }

    #[test]
    fn test_single_critical_cpu() {
        let samples = vec![sample("cpu_usage", 92.0)];
        let alerts = vec![critical_alert("cpu_usage")];
        let snapshot = HealthAggregator::compute(&samples, &alerts);

        assert_eq!(snapshot.health_score, 65.0);
        assert_eq!(snapshot.status, HealthStatus::Degraded);
        assert_eq!(snapshot.performance_grade, PerformanceGrade::C);
        assert_eq!(snapshot.bottlenecks, vec!["cpu_usage is critical (92.0 percent)"]);
        assert_eq!(
            snapshot.recommendations,
            vec![
                "Address performance bottlenecks identified",
                "Immediately resolve critical performance alerts",
                "Review system capacity and resource allocation",
            ]
        );
        assert_eq!(snapshot.active_alerts, 1);
    }

    #[test]
    fn test_warning_sample_and_alert() {
        let samples = vec![sample("memory_usage", 75.0)];
        let alerts = vec![Alert::new(AlertType::Warning, "memory_usage", 75.0, 70.0, "elevated")];
        let snapshot = HealthAggregator::compute(&samples, &alerts);

        assert_eq!(snapshot.health_score, 85.0);
        assert_eq!(snapshot.status, HealthStatus::Good);
        assert_eq!(snapshot.bottlenecks, vec!["memory_usage is elevated (75.0 percent)"]);
        assert_eq!(snapshot.recommendations, vec!["Address performance bottlenecks identified"]);
    }

    #[test]
    fn test_recovery_alerts_do_not_penalize() {
        let alerts = vec![Alert::new(AlertType::Recovery, "cpu_usage", 10.0, 70.0, "recovered").resolved()];
        let snapshot = HealthAggregator::compute(&[sample("cpu_usage", 10.0)], &alerts);
        assert_eq!(snapshot.health_score, 100.0);
        assert_eq!(snapshot.active_alerts, 1);
    }

    #[test]
    fn test_score_is_clamped_and_monotonic() {
        let mut previous = 100.0;
        let mut samples = Vec::new();
        let mut alerts = Vec::new();

        for i in 0..8 {
            samples.push(sample(&format!("metric_{}", i), 99.0));
            alerts.push(critical_alert(&format!("metric_{}", i)));
            let snapshot = HealthAggregator::compute(&samples, &alerts);
            assert!(snapshot.health_score <= previous);
            assert!((0.0..=100.0).contains(&snapshot.health_score));
            previous = snapshot.health_score;
        }

        assert_eq!(previous, 0.0);
        let snapshot = HealthAggregator::compute(&samples, &alerts);
        assert_eq!(snapshot.status, HealthStatus::Critical);
        assert_eq!(snapshot.performance_grade, PerformanceGrade::F);
    }

    #[test]
    fn test_deterministic() {
        let ts = Utc::now();
        let samples = vec![sample("cpu_usage", 80.0)];
        assert_eq!(
            HealthAggregator::compute_at(&samples, &[], ts),
            HealthAggregator::compute_at(&samples, &[], ts)
        );
    }
}
