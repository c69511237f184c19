use crate::notifier::AlertNotifier;
use chrono::{DateTime, Duration, Utc};
use perfwatch_store::{MetricStore, StoreError};
use perfwatch_types::{Alert, AlertType, MetricSample};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// 同一指标、同一类型告警的最小间隔
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 15;

/// 时间源
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 阈值评估器
///
/// 对每条采样分类（critical / warning / recovery），经冷却检查后
/// 先持久化告警，再按注册顺序通知各个通知器。
///
/// 冷却表由内部锁保护，检查、持久化、记录三步在同一把写锁内完成，
/// 因此评估器可以放在 `Arc` 中被多个任务共享。冷却时间只在告警真正
/// 发出时刷新，被抑制的评估不会延长冷却窗口。
pub struct ThresholdEvaluator {
    store: Arc<dyn MetricStore>,
    notifiers: Vec<Box<dyn AlertNotifier>>,
    // 冷却键 -> 上次发出时间
    last_alert_time: RwLock<HashMap<String, DateTime<Utc>>>,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
}

impl ThresholdEvaluator {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self {
            store,
            notifiers: Vec::new(),
            last_alert_time: RwLock::new(HashMap::new()),
            cooldown: Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn AlertNotifier>) -> Self {
        self.register_notifier(notifier);
        self
    }

    /// 注册通知器，按注册顺序调用
    pub fn register_notifier(&mut self, notifier: Box<dyn AlertNotifier>) {
        info!("Registered alert notifier: {}", notifier.name());
        self.notifiers.push(notifier);
    }

    pub fn notifier_count(&self) -> usize {
        self.notifiers.len()
    }

    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    /// 评估一条采样，返回实际发出的告警（未触发或被冷却抑制时为 `None`）
    ///
    /// 告警写入失败时返回错误：不通知、不记录冷却，下个周期会重试。
    pub async fn evaluate(&self, sample: &MetricSample) -> Result<Option<Alert>, StoreError> {
        let now = self.clock.now();
        let Some(alert) = self.classify(sample, now).await? else {
            return Ok(None);
        };

        let key = alert.cooldown_key();
        {
            let mut last_times = self.last_alert_time.write().await;
            if let Some(last) = last_times.get(&key) {
                let elapsed = now - *last;
                if elapsed < self.cooldown {
                    debug!(
                        key = %key,
                        "Alert suppressed (last fired {} seconds ago)",
                        elapsed.num_seconds()
                    );
                    return Ok(None);
                }
            }

            self.store.write_alert(&alert).await?;
            last_times.insert(key, now);
        }

        self.dispatch(&alert).await;
        Ok(Some(alert))
    }

    /// 不考虑冷却的分类
    async fn classify(&self, sample: &MetricSample, now: DateTime<Utc>) -> Result<Option<Alert>, StoreError> {
        let alert = match sample.breach() {
            Some(AlertType::Critical) => {
                let threshold = sample.threshold_critical.unwrap_or_default();
                Some(Alert::new(
                    AlertType::Critical,
                    &sample.name,
                    sample.value,
                    threshold,
                    format!(
                        "{} is critically high: {:.2} {} (threshold: {})",
                        sample.name, sample.value, sample.unit, threshold
                    ),
                ))
            }
            Some(_) => {
                let threshold = sample.threshold_warning.unwrap_or_default();
                Some(Alert::new(
                    AlertType::Warning,
                    &sample.name,
                    sample.value,
                    threshold,
                    format!(
                        "{} is elevated: {:.2} {} (threshold: {})",
                        sample.name, sample.value, sample.unit, threshold
                    ),
                ))
            }
            None => {
                if !self.has_unrecovered_alert(&sample.name).await? {
                    return Ok(None);
                }
                Some(
                    Alert::new(
                        AlertType::Recovery,
                        &sample.name,
                        sample.value,
                        sample.threshold_warning.unwrap_or(0.0),
                        format!(
                            "{} has recovered: {:.2} {}",
                            sample.name, sample.value, sample.unit
                        ),
                    )
                    .resolved(),
                )
            }
        };

        Ok(alert.map(|a| a.at(now)))
    }

    /// 是否存在比最近一次恢复更新的未解决告警
    async fn has_unrecovered_alert(&self, metric_name: &str) -> Result<bool, StoreError> {
        let Some(newest) = self.store.latest_active_alert_for(metric_name).await? else {
            return Ok(false);
        };

        match self.store.latest_recovery(metric_name).await? {
            Some(recovery) => Ok(newest.timestamp > recovery.timestamp),
            None => Ok(true),
        }
    }

    async fn dispatch(&self, alert: &Alert) {
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(alert).await {
                error!("Failed to send notification via {}: {}", notifier.name(), e);
            }
        }
    }

    /// 清理早已过期的冷却记录
    pub async fn cleanup_expired(&self) {
        let now = self.clock.now();
        let expiry = self.cooldown * 2;
        let mut last_times = self.last_alert_time.write().await;
        let before = last_times.len();
        last_times.retain(|_, last| now - *last < expiry);

        let removed = before - last_times.len();
        if removed > 0 {
            debug!("Cleaned up {} expired cooldown entries", removed);
        }
    }

    pub async fn cooldown_entries(&self) -> usize {
        self.last_alert_time.read().await.len()
    }
}
