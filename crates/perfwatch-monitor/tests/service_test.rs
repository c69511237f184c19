use async_trait::async_trait;
use perfwatch_metrics::{Collector, ThresholdEvaluator};
use perfwatch_monitor::{LoopState, MonitorService};
use perfwatch_store::{MetricStore, SqliteMetricStore};
use perfwatch_types::{HealthStatus, MetricSample};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct StaticCollector {
    samples: Vec<MetricSample>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Collector for StaticCollector {
    async fn collect(&self) -> Vec<MetricSample> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.samples.clone()
    }

    fn name(&self) -> &str {
        "static"
    }
}

struct SlowCollector;

#[async_trait]
impl Collector for SlowCollector {
    async fn collect(&self) -> Vec<MetricSample> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Vec::new()
    }

    fn name(&self) -> &str {
        "slow"
    }
}

struct PanickingCollector;

#[async_trait]
impl Collector for PanickingCollector {
    async fn collect(&self) -> Vec<MetricSample> {
        panic!("collector crashed");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

struct TimedCollector {
    started: Arc<std::sync::Mutex<Vec<std::time::Instant>>>,
    work: Duration,
}

#[async_trait]
impl Collector for TimedCollector {
    async fn collect(&self) -> Vec<MetricSample> {
        self.started
            .lock()
            .unwrap()
            .push(std::time::Instant::now());
        tokio::time::sleep(self.work).await;
        Vec::new()
    }

    fn name(&self) -> &str {
        "timed"
    }
}

async fn memory_store() -> Arc<dyn MetricStore> {
    Arc::new(SqliteMetricStore::connect("sqlite::memory:").await.unwrap())
}

async fn service_with(samples: Vec<MetricSample>) -> (Arc<MonitorService>, Arc<AtomicUsize>) {
    let store: Arc<dyn MetricStore> = Arc::new(SqliteMetricStore::connect("sqlite::memory:").await.unwrap());
    let evaluator = ThresholdEvaluator::new(store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let service = MonitorService::new(store, evaluator)
        .with_collector(Box::new(StaticCollector {
            samples,
            calls: calls.clone(),
        }))
        .with_interval(Duration::from_millis(50));

    (Arc::new(service), calls)
}

#[tokio::test]
async fn test_run_cycle_persists_samples_and_snapshot() {
    let cpu = MetricSample::new("cpu_usage", 92.0, "percent").with_thresholds(Some(70.0), Some(85.0));
    let memory = MetricSample::new("memory_usage", 40.0, "percent").with_thresholds(Some(75.0), Some(90.0));
    let (service, _) = service_with(vec![cpu, memory]).await;

    let outcome = service.run_cycle().await.unwrap();
    assert_eq!(outcome.samples.len(), 2);
    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.snapshot.health_score, 65.0);
    assert_eq!(outcome.snapshot.status, HealthStatus::Degraded);

    let store = service.store();
    assert_eq!(store.recent_metrics("cpu_usage", chrono::Duration::hours(1)).await.unwrap().len(), 1);
    assert_eq!(store.active_alerts().await.unwrap().len(), 1);

    let latest = store.latest_health_snapshot().await.unwrap().unwrap();
    assert_eq!(latest.health_score, 65.0);
    assert_eq!(latest.active_alerts, 1);
}

#[tokio::test]
async fn test_invalid_sample_does_not_abort_cycle() {
    let bad = MetricSample::new("", 1.0, "percent");
    let good = MetricSample::new("disk_usage", 50.0, "percent").with_thresholds(Some(80.0), Some(95.0));
    let (service, _) = service_with(vec![bad, good]).await;

    let outcome = service.run_cycle().await.unwrap();
    assert_eq!(outcome.samples.len(), 2);

    let stored = service
        .store()
        .recent_metrics("disk_usage", chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert!(service.store().latest_health_snapshot().await.unwrap().is_some());
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let (service, _) = service_with(Vec::new()).await;

    assert!(service.start().await);
    assert_eq!(service.state().await, LoopState::Running);
    assert!(!service.start().await);

    service.stop().await;
    assert_eq!(service.state().await, LoopState::Stopped);
}

#[tokio::test]
async fn test_loop_runs_repeatedly_until_stopped() {
    let (service, calls) = service_with(vec![MetricSample::new("cpu_usage", 10.0, "percent")]).await;

    service.start().await;
    tokio::time::sleep(Duration::from_millis(220)).await;
    service.stop().await;

    let cycles = calls.load(Ordering::SeqCst);
    assert!(cycles >= 2, "expected several cycles, got {}", cycles);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(calls.load(Ordering::SeqCst), cycles);
}

#[tokio::test]
async fn test_stop_aborts_stuck_cycle() {
    let store: Arc<dyn MetricStore> = Arc::new(SqliteMetricStore::connect("sqlite::memory:").await.unwrap());
    let service = Arc::new(
        MonitorService::new(store.clone(), ThresholdEvaluator::new(store))
            .with_collector(Box::new(SlowCollector))
            .with_stop_timeout(Duration::from_millis(100)),
    );

    service.start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = std::time::Instant::now();
    service.stop().await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(service.state().await, LoopState::Stopped);

    // 停止后可以重新启动
    assert!(service.start().await);
    service.stop().await;
}

#[tokio::test]
async fn test_stop_when_not_running_is_noop() {
    let (service, calls) = service_with(Vec::new()).await;
    service.stop().await;
    assert_eq!(service.state().await, LoopState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_interval_is_clamped_and_loop_keeps_running() {
    let store = memory_store().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let service = Arc::new(
        MonitorService::new(store.clone(), ThresholdEvaluator::new(store))
            .with_collector(Box::new(StaticCollector {
                samples: vec![MetricSample::new("cpu_usage", 10.0, "percent")],
                calls: calls.clone(),
            }))
            .with_interval(Duration::ZERO),
    );
    assert!(service.interval() > Duration::ZERO);

    assert!(service.start().await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(service.state().await, LoopState::Running);
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert!(service.store().latest_health_snapshot().await.unwrap().is_some());

    service.stop().await;
    assert_eq!(service.state().await, LoopState::Stopped);
}

#[tokio::test]
async fn test_crashed_loop_reports_stopped_and_can_restart() {
    let store = memory_store().await;
    let service = Arc::new(
        MonitorService::new(store.clone(), ThresholdEvaluator::new(store))
            .with_collector(Box::new(PanickingCollector))
            .with_interval(Duration::from_millis(10)),
    );

    assert!(service.start().await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(service.state().await, LoopState::Stopped);
    assert!(service.start().await);
    service.stop().await;
}

#[tokio::test]
async fn test_full_interval_elapses_between_cycles() {
    let store = memory_store().await;
    let started = Arc::new(std::sync::Mutex::new(Vec::new()));
    let service = Arc::new(
        MonitorService::new(store.clone(), ThresholdEvaluator::new(store))
            .with_collector(Box::new(TimedCollector {
                started: started.clone(),
                work: Duration::from_millis(80),
            }))
            .with_interval(Duration::from_millis(100)),
    );

    service.start().await;
    tokio::time::sleep(Duration::from_millis(450)).await;
    service.stop().await;

    let started = started.lock().unwrap().clone();
    assert!(started.len() >= 2, "expected at least two cycles, got {}", started.len());
    for pair in started.windows(2) {
        // 周期耗时 80ms + 间隔 100ms
        assert!(pair[1] - pair[0] >= Duration::from_millis(180));
    }
}
