use chrono::{Duration, Utc};
use perfwatch_metrics::PerformanceOptimizer;
use perfwatch_monitor::generate_report;
use perfwatch_store::{MetricStore, SqliteMetricStore};
use perfwatch_types::{Alert, AlertType, HealthSnapshot, HealthStatus, MetricSample, PerformanceGrade, Trend};

async fn store() -> SqliteMetricStore {
    SqliteMetricStore::connect("sqlite::memory:").await.unwrap()
}

#[tokio::test]
async fn test_empty_store_report() {
    let store = store().await;
    let report = generate_report(&store, 24, &PerformanceOptimizer::new()).await.unwrap();

    assert!(report.metrics_summary.is_empty());
    assert_eq!(report.active_alerts, 0);
    assert!(report.system_health.is_none());
    assert!(report.recommendations.is_empty());
    assert_eq!(report.report_period.duration_hours, 24);
    assert_eq!(report.report_period.end - report.report_period.start, Duration::hours(24));
}

#[tokio::test]
async fn test_report_summaries_and_trend() {
    let store = store().await;
    let now = Utc::now();

    for (minutes_ago, value) in [(30, 60.0), (20, 70.0), (10, 80.0)] {
        let sample = MetricSample::new("cpu_usage", value, "percent").at(now - Duration::minutes(minutes_ago));
        store.write_sample(&sample).await.unwrap();
    }
    let stale = MetricSample::new("memory_usage", 99.0, "percent").at(now - Duration::hours(48));
    store.write_sample(&stale).await.unwrap();

    let report = generate_report(&store, 24, &PerformanceOptimizer::new()).await.unwrap();

    let cpu = &report.metrics_summary["cpu_usage"];
    assert_eq!(cpu.current, 80.0);
    assert_eq!(cpu.min, 60.0);
    assert_eq!(cpu.max, 80.0);
    assert!((cpu.average - 70.0).abs() < 1e-9);
    assert_eq!(cpu.trend, Trend::Degrading);
    assert_eq!(cpu.data_points, 3);

    assert!(!report.metrics_summary.contains_key("memory_usage"));
    assert!(report.recommendations.iter().any(|r| r.starts_with("high_cpu_usage")));
}

#[tokio::test]
async fn test_report_includes_alerts_and_health() {
    let store = store().await;

    let alert = Alert::new(AlertType::Critical, "disk_usage", 97.0, 95.0, "disk_usage is critical: 97.0");
    store.write_alert(&alert).await.unwrap();

    let snapshot = HealthSnapshot {
        timestamp: Utc::now(),
        health_score: 80.0,
        status: HealthStatus::Healthy,
        performance_grade: PerformanceGrade::B,
        active_alerts: 1,
        bottlenecks: vec!["disk_usage".to_string()],
        recommendations: vec!["Consider optimizing resource usage".to_string()],
    };
    store.write_snapshot(&snapshot).await.unwrap();

    let report = generate_report(&store, 1, &PerformanceOptimizer::new()).await.unwrap();
    assert_eq!(report.active_alerts, 1);

    let health = report.system_health.unwrap();
    assert_eq!(health.health_score, 80.0);
    assert_eq!(health.bottlenecks, vec!["disk_usage".to_string()]);
    assert_eq!(report.recommendations[0], "Consider optimizing resource usage");
}
