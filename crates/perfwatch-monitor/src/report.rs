use chrono::{Duration, Utc};
use perfwatch_metrics::PerformanceOptimizer;
use perfwatch_store::{MetricStore, StoreError};
use perfwatch_types::{MetricSummary, PerformanceReport, ReportPeriod};
use std::collections::BTreeMap;
use tracing::error;

/// 报告中汇总的关键指标
pub const KEY_METRICS: &[&str] = &[
    "cpu_usage",
    "memory_usage",
    "disk_usage",
    "api_response_time_linear",
    "api_response_time_github",
];

/// 生成最近 `hours` 小时的性能报告
pub async fn generate_report(
    store: &dyn MetricStore,
    hours: u32,
    optimizer: &PerformanceOptimizer,
) -> Result<PerformanceReport, StoreError> {
    let end = Utc::now();
    let window = Duration::hours(i64::from(hours));

    let mut metrics_summary = BTreeMap::new();
    let mut advice = Vec::new();

    for name in KEY_METRICS {
        let samples = store.recent_metrics(name, window).await?;
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();

        if let Some(summary) = MetricSummary::from_values(&values) {
            metrics_summary.insert(name.to_string(), summary);
        }
        if let Some(latest) = samples.first() {
            advice.extend(optimizer.advise(latest));
        }
    }

    let active_alerts = store.active_alerts().await?.len();

    let system_health = match store.latest_health_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to get system health: {}", e);
            None
        }
    };

    let mut recommendations: Vec<String> = system_health
        .as_ref()
        .map(|h| h.recommendations.clone())
        .unwrap_or_default();
    recommendations.extend(advice);

    Ok(PerformanceReport {
        report_period: ReportPeriod {
            start: end - window,
            end,
            duration_hours: hours,
        },
        metrics_summary,
        active_alerts,
        system_health,
        recommendations,
    })
}
