use crate::db::schema::init_schema;
use crate::db::{performance_alert, performance_metric, system_health};
use crate::error::{Result, StoreError};
use crate::store::MetricStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use perfwatch_types::{Alert, AlertType, HealthSnapshot, MetricSample};
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use tracing::{debug, info};

/// 基于 SQLite 的指标存储
pub struct SqliteMetricStore {
    db: DatabaseConnection,
}

impl SqliteMetricStore {
    /// 连接数据库并初始化表结构
    ///
    /// `url` 形如 `sqlite://performance.db?mode=rwc` 或 `sqlite::memory:`。
    pub async fn connect(url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(url.to_string());
        options.sqlx_logging(false);
        if url.contains(":memory:") {
            // 内存库每个连接各自独立，只能用单连接
            options.max_connections(1).min_connections(1);
        }

        let db = Database::connect(options).await?;
        init_schema(&db).await?;
        info!(url = %url, "Metric store initialized");

        Ok(Self { db })
    }

    /// 使用已有连接（调用方负责表结构）
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn validate_sample(sample: &MetricSample) -> Result<()> {
    if sample.name.trim().is_empty() {
        return Err(StoreError::validation("metric name is required"));
    }
    if sample.unit.trim().is_empty() {
        return Err(StoreError::validation(format!(
            "unit is required for metric '{}'",
            sample.name
        )));
    }
    if !sample.value.is_finite() {
        return Err(StoreError::validation(format!(
            "value of metric '{}' is not finite",
            sample.name
        )));
    }
    Ok(())
}

fn validate_alert(alert: &Alert) -> Result<()> {
    if alert.metric_name.trim().is_empty() {
        return Err(StoreError::validation("alert metric name is required"));
    }
    if alert.message.trim().is_empty() {
        return Err(StoreError::validation("alert message is required"));
    }
    if !alert.current_value.is_finite() || !alert.threshold.is_finite() {
        return Err(StoreError::validation(format!(
            "alert values for '{}' are not finite",
            alert.metric_name
        )));
    }
    Ok(())
}

#[async_trait]
impl MetricStore for SqliteMetricStore {
    async fn write_sample(&self, sample: &MetricSample) -> Result<()> {
        validate_sample(sample)?;
        let active_model: performance_metric::ActiveModel = sample.clone().into();
        performance_metric::Entity::insert(active_model)
            .exec(&self.db)
            .await?;
        debug!(metric = %sample.name, value = sample.value, "Sample stored");
        Ok(())
    }

    async fn write_alert(&self, alert: &Alert) -> Result<()> {
        validate_alert(alert)?;
        let active_model: performance_alert::ActiveModel = alert.clone().into();
        performance_alert::Entity::insert(active_model)
            .exec(&self.db)
            .await?;
        debug!(
            metric = %alert.metric_name,
            alert_type = alert.alert_type.as_str(),
            "Alert stored"
        );
        Ok(())
    }

    async fn write_snapshot(&self, snapshot: &HealthSnapshot) -> Result<()> {
        if !snapshot.health_score.is_finite() {
            return Err(StoreError::validation("health score is not finite"));
        }
        let active_model = system_health::ActiveModel::try_from(snapshot.clone())?;
        system_health::Entity::insert(active_model)
            .exec(&self.db)
            .await?;
        debug!(score = snapshot.health_score, "Health snapshot stored");
        Ok(())
    }

    async fn recent_metrics(&self, name: &str, since: Duration) -> Result<Vec<MetricSample>> {
        let start = Utc::now() - since;

        let models = performance_metric::Entity::find()
            .filter(performance_metric::Column::MetricName.eq(name))
            .filter(performance_metric::Column::Timestamp.gte(start))
            .order_by_desc(performance_metric::Column::Timestamp)
            .order_by_desc(performance_metric::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(MetricSample::from).collect())
    }

    async fn active_alerts(&self) -> Result<Vec<Alert>> {
        let models = performance_alert::Entity::find()
            .filter(performance_alert::Column::Resolved.eq(false))
            .order_by_desc(performance_alert::Column::Timestamp)
            .order_by_desc(performance_alert::Column::Id)
            .all(&self.db)
            .await?;

        models.into_iter().map(Alert::try_from).collect()
    }

    async fn active_alerts_for(&self, metric_name: &str) -> Result<Vec<Alert>> {
        let models = performance_alert::Entity::find()
            .filter(performance_alert::Column::MetricName.eq(metric_name))
            .filter(performance_alert::Column::Resolved.eq(false))
            .order_by_desc(performance_alert::Column::Timestamp)
            .order_by_desc(performance_alert::Column::Id)
            .all(&self.db)
            .await?;

        models.into_iter().map(Alert::try_from).collect()
    }

    async fn latest_active_alert_for(&self, metric_name: &str) -> Result<Option<Alert>> {
        let model = performance_alert::Entity::find()
            .filter(performance_alert::Column::MetricName.eq(metric_name))
            .filter(performance_alert::Column::Resolved.eq(false))
            .order_by_desc(performance_alert::Column::Timestamp)
            .order_by_desc(performance_alert::Column::Id)
            .one(&self.db)
            .await?;

        model.map(Alert::try_from).transpose()
    }

    async fn latest_recovery(&self, metric_name: &str) -> Result<Option<Alert>> {
        let model = performance_alert::Entity::find()
            .filter(performance_alert::Column::MetricName.eq(metric_name))
            .filter(performance_alert::Column::AlertType.eq(AlertType::Recovery.as_str()))
            .order_by_desc(performance_alert::Column::Timestamp)
            .order_by_desc(performance_alert::Column::Id)
            .one(&self.db)
            .await?;

        model.map(Alert::try_from).transpose()
    }

    async fn latest_health_snapshot(&self) -> Result<Option<HealthSnapshot>> {
        let model = system_health::Entity::find()
            .order_by_desc(system_health::Column::Timestamp)
            .order_by_desc(system_health::Column::Id)
            .one(&self.db)
            .await?;

        model.map(HealthSnapshot::try_from).transpose()
    }
}
