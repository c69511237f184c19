use anyhow::{Context, Result};
use perfwatch_metrics::{Collector, HealthAggregator, PerformanceOptimizer, ThresholdEvaluator};
use perfwatch_store::MetricStore;
use perfwatch_types::{Alert, HealthSnapshot, MetricSample};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// 默认采集间隔
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// 最小采集间隔
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// 默认停止等待上限
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// 监控循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
    StopRequested,
}

/// 单个周期的结果
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub samples: Vec<MetricSample>,
    pub alerts: Vec<Alert>,
    pub snapshot: HealthSnapshot,
    pub advice: Vec<String>,
}

struct LoopHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: JoinHandle<()>,
}

/// 性能监控服务
///
/// 每个周期依次调用所有采集器，逐条写入采样并评估阈值，
/// 最后计算健康快照并持久化。同一时间只运行一个后台循环。
pub struct MonitorService {
    store: Arc<dyn MetricStore>,
    collectors: Vec<Box<dyn Collector>>,
    evaluator: Arc<ThresholdEvaluator>,
    optimizer: PerformanceOptimizer,

    interval: Duration,
    stop_timeout: Duration,

    state: RwLock<LoopState>,
    handle: Mutex<Option<LoopHandle>>,
}

impl MonitorService {
    pub fn new(store: Arc<dyn MetricStore>, evaluator: ThresholdEvaluator) -> Self {
        Self {
            store,
            collectors: Vec::new(),
            evaluator: Arc::new(evaluator),
            optimizer: PerformanceOptimizer::new(),
            interval: DEFAULT_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            state: RwLock::new(LoopState::Stopped),
            handle: Mutex::new(None),
        }
    }

    pub fn with_collector(mut self, collector: Box<dyn Collector>) -> Self {
        info!("Registered collector: {}", collector.name());
        self.collectors.push(collector);
        self
    }

    /// 设置两个周期之间的间隔，不小于 [`MIN_INTERVAL`]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    pub fn evaluator(&self) -> &Arc<ThresholdEvaluator> {
        &self.evaluator
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 当前循环状态；后台任务已意外退出时视为 `Stopped`
    pub async fn state(&self) -> LoopState {
        let mut state = self.state.write().await;
        self.reap_finished(&mut state).await;
        *state
    }

    /// 回收已经结束的后台任务（例如周期内 panic），把状态复位为 `Stopped`
    async fn reap_finished(&self, state: &mut LoopState) {
        if *state != LoopState::Running {
            return;
        }

        let mut handle = self.handle.lock().await;
        let finished = handle
            .as_ref()
            .is_some_and(|h| h.join_handle.is_finished());
        if !finished {
            return;
        }

        if let Some(LoopHandle { join_handle, .. }) = handle.take() {
            if let Err(e) = join_handle.await {
                error!("Monitoring task terminated unexpectedly: {}", e);
            }
        }
        *state = LoopState::Stopped;
    }

    /// 启动后台循环；已在运行时只记录警告并返回 `false`
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut state = self.state.write().await;
        self.reap_finished(&mut state).await;
        if *state != LoopState::Stopped {
            warn!("Performance monitoring is already active");
            return false;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let service = Arc::clone(self);
        let period = self.interval;

        let join_handle = tokio::spawn(async move {
            // 停止信号只在周期之间检查；每个周期结束后完整休眠一个间隔
            while !*shutdown_rx.borrow() {
                if let Err(e) = service.run_cycle().await {
                    error!("Error in monitoring loop: {:#}", e);
                }

                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = sleep(period) => {}
                }
            }

            debug!("Monitoring loop exited");
        });

        *self.handle.lock().await = Some(LoopHandle {
            shutdown_tx,
            join_handle,
        });
        *state = LoopState::Running;

        info!(interval = ?period, "Performance monitoring started");
        true
    }

    /// 请求停止并等待当前周期结束，超过 `stop_timeout` 则中止任务
    pub async fn stop(&self) {
        let handle = {
            let mut state = self.state.write().await;
            if *state == LoopState::Stopped {
                return;
            }
            *state = LoopState::StopRequested;
            self.handle.lock().await.take()
        };

        if let Some(LoopHandle {
            shutdown_tx,
            mut join_handle,
        }) = handle
        {
            let _ = shutdown_tx.send(true);

            match timeout(self.stop_timeout, &mut join_handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Monitoring task ended abnormally: {}", e),
                Err(_) => {
                    warn!(
                        "Monitoring task did not stop within {:?}, aborting",
                        self.stop_timeout
                    );
                    join_handle.abort();
                }
            }
        }

        *self.state.write().await = LoopState::Stopped;
        info!("Performance monitoring stopped");
    }

    /// 执行一个完整的采集-评估-聚合周期
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let mut samples = Vec::new();
        for collector in &self.collectors {
            let batch = collector.collect().await;
            debug!(collector = collector.name(), count = batch.len(), "Collected samples");
            samples.extend(batch);
        }

        let mut alerts = Vec::new();
        for sample in &samples {
            if let Err(e) = self.store.write_sample(sample).await {
                error!(metric = %sample.name, "Failed to store metric: {}", e);
            }

            match self.evaluator.evaluate(sample).await {
                Ok(Some(alert)) => alerts.push(alert),
                Ok(None) => {}
                Err(e) => error!(metric = %sample.name, "Failed to evaluate thresholds: {}", e),
            }
        }

        let advice = self.optimizer.analyze(&samples);
        if !advice.is_empty() {
            info!("Optimization advice: {:?}", advice);
        }

        let snapshot = HealthAggregator::compute(&samples, &alerts);
        self.store
            .write_snapshot(&snapshot)
            .await
            .context("failed to persist health snapshot")?;

        if !alerts.is_empty() {
            warn!("Generated {} performance alerts", alerts.len());
        }
        debug!(
            samples = samples.len(),
            score = snapshot.health_score,
            "Monitoring cycle complete"
        );

        self.evaluator.cleanup_expired().await;

        Ok(CycleOutcome {
            samples,
            alerts,
            snapshot,
            advice,
        })
    }
}
