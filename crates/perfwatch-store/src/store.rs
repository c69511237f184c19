use crate::error::Result;
use async_trait::async_trait;
use chrono::Duration;
use perfwatch_types::{Alert, HealthSnapshot, MetricSample};

/// 指标记录存储
///
/// 所有写入在返回前落盘，单行写入是原子的。读取方只会看到已提交的行。
/// 采样、告警、健康快照三类记录都只追加、不修改。
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// 写入一条采样
    async fn write_sample(&self, sample: &MetricSample) -> Result<()>;

    /// 写入一条告警
    async fn write_alert(&self, alert: &Alert) -> Result<()>;

    /// 写入一条健康快照
    async fn write_snapshot(&self, snapshot: &HealthSnapshot) -> Result<()>;

    /// 查询 `now - since` 之后的同名采样，按时间倒序
    async fn recent_metrics(&self, name: &str, since: Duration) -> Result<Vec<MetricSample>>;

    /// 所有未解决的告警，按时间倒序
    async fn active_alerts(&self) -> Result<Vec<Alert>>;

    /// 指定指标未解决的告警，按时间倒序
    async fn active_alerts_for(&self, metric_name: &str) -> Result<Vec<Alert>>;

    /// 指定指标最新的一条未解决告警
    async fn latest_active_alert_for(&self, metric_name: &str) -> Result<Option<Alert>>;

    /// 指定指标最近一次恢复告警
    async fn latest_recovery(&self, metric_name: &str) -> Result<Option<Alert>>;

    /// 最近一次健康快照
    async fn latest_health_snapshot(&self) -> Result<Option<HealthSnapshot>>;
}
