use crate::collector::{Collector, CollectorError};
use crate::thresholds::ThresholdTable;
use async_trait::async_trait;
use chrono::Utc;
use perfwatch_types::MetricSample;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::{Disks, System};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const SECTOR_SIZE: u64 = 512;

/// 系统采集器配置
#[derive(Debug, Clone)]
pub struct SystemCollectorConfig {
    /// 网络延迟探测目标（host:port）
    pub probe_hosts: Vec<String>,
    pub probe_timeout: Duration,
    /// CPU 使用率的采样窗口
    pub cpu_sample_window: Duration,
    pub diskstats_path: PathBuf,
    pub thresholds: ThresholdTable,
}

impl Default for SystemCollectorConfig {
    fn default() -> Self {
        Self {
            probe_hosts: vec![
                "api.linear.app:443".to_string(),
                "api.github.com:443".to_string(),
                "8.8.8.8:53".to_string(),
            ],
            probe_timeout: Duration::from_secs(5),
            cpu_sample_window: Duration::from_secs(1),
            diskstats_path: PathBuf::from("/proc/diskstats"),
            thresholds: ThresholdTable::default(),
        }
    }
}

/// 磁盘 I/O 累计计数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiskIoTotals {
    pub read_count: u64,
    pub write_count: u64,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

impl DiskIoTotals {
    /// 平均每次 I/O 耗时（毫秒）
    pub fn latency_ms(&self) -> f64 {
        let ops = (self.read_count + self.write_count).max(1);
        (self.read_time_ms + self.write_time_ms) as f64 / ops as f64
    }
}

/// 解析 `/proc/diskstats`，只累加 `is_device` 接受的设备
pub fn parse_diskstats(content: &str, is_device: impl Fn(&str) -> bool) -> Option<DiskIoTotals> {
    let mut totals = DiskIoTotals::default();
    let mut seen = false;

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 11 || !is_device(fields[2]) {
            continue;
        }

        let parse = |i: usize| fields[i].parse::<u64>().ok();
        let (Some(reads), Some(sectors_read), Some(read_ms), Some(writes), Some(sectors_written), Some(write_ms)) =
            (parse(3), parse(5), parse(6), parse(7), parse(9), parse(10))
        else {
            continue;
        };

        totals.read_count += reads;
        totals.read_time_ms += read_ms;
        totals.read_bytes += sectors_read * SECTOR_SIZE;
        totals.write_count += writes;
        totals.write_time_ms += write_ms;
        totals.write_bytes += sectors_written * SECTOR_SIZE;
        seen = true;
    }

    seen.then_some(totals)
}

/// 物理块设备（排除分区、loop 与 ram 盘）
fn is_block_device(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") {
        return false;
    }
    Path::new("/sys/block").join(name).exists()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 系统资源采集器
pub struct SystemCollector {
    system: Mutex<System>,
    config: SystemCollectorConfig,
}

impl SystemCollector {
    pub fn new(config: SystemCollectorConfig) -> Self {
        Self {
            system: Mutex::new(System::new()),
            config,
        }
    }

    async fn cpu_and_memory(&self) -> Vec<MetricSample> {
        let thresholds = &self.config.thresholds;
        let mut samples = Vec::new();
        let mut system = self.system.lock().await;

        system.refresh_cpu();
        tokio::time::sleep(self.config.cpu_sample_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
        system.refresh_cpu();
        system.refresh_memory();

        let cpu = system.global_cpu_info().cpu_usage() as f64;
        samples.push(thresholds.apply(
            "cpu_usage",
            MetricSample::new("cpu_usage", cpu, "percent")
                .with_metadata(json!({ "cores": system.cpus().len() })),
        ));

        let total = system.total_memory();
        if total == 0 {
            warn!("Total memory reported as zero, skipping memory_usage");
        } else {
            let available = system.available_memory();
            let used = system.used_memory();
            let percent = total.saturating_sub(available) as f64 / total as f64 * 100.0;
            samples.push(thresholds.apply(
                "memory_usage",
                MetricSample::new("memory_usage", percent, "percent").with_metadata(json!({
                    "total_gb": round2(total as f64 / BYTES_PER_GB),
                    "available_gb": round2(available as f64 / BYTES_PER_GB),
                    "used_gb": round2(used as f64 / BYTES_PER_GB),
                })),
            ));
        }

        samples
    }

    fn disk_usage(&self) -> Result<MetricSample, CollectorError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| disks.list().iter().max_by_key(|d| d.total_space()))
            .ok_or_else(|| CollectorError::Unavailable("no disks found".to_string()))?;

        let total = disk.total_space();
        if total == 0 {
            return Err(CollectorError::Unavailable(format!(
                "disk {:?} reports zero capacity",
                disk.mount_point()
            )));
        }
        let free = disk.available_space();
        let used = total.saturating_sub(free);

        Ok(self.config.thresholds.apply(
            "disk_usage",
            MetricSample::new("disk_usage", used as f64 / total as f64 * 100.0, "percent")
                .with_metadata(json!({
                    "total_gb": round2(total as f64 / BYTES_PER_GB),
                    "used_gb": round2(used as f64 / BYTES_PER_GB),
                    "free_gb": round2(free as f64 / BYTES_PER_GB),
                })),
        ))
    }

    async fn disk_io_latency(&self) -> Result<Option<MetricSample>, CollectorError> {
        if !cfg!(target_os = "linux") {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&self.config.diskstats_path).await?;
        let Some(totals) = parse_diskstats(&content, is_block_device) else {
            return Ok(None);
        };

        Ok(Some(self.config.thresholds.apply(
            "disk_io_latency",
            MetricSample::new("disk_io_latency", totals.latency_ms(), "ms").with_metadata(json!({
                "read_bytes": totals.read_bytes,
                "write_bytes": totals.write_bytes,
                "read_count": totals.read_count,
                "write_count": totals.write_count,
            })),
        )))
    }

    fn load_average(&self) -> Option<MetricSample> {
        if !cfg!(unix) {
            return None;
        }

        let load = System::load_average();
        Some(self.config.thresholds.apply(
            "load_average",
            MetricSample::new("load_average", load.one, "ratio").with_metadata(json!({
                "load_1min": load.one,
                "load_5min": load.five,
                "load_15min": load.fifteen,
            })),
        ))
    }

    /// 对每个探测目标建立一次 TCP 连接，返回成功连接的平均耗时（毫秒）
    pub async fn network_latency(&self) -> Option<f64> {
        let mut latencies = Vec::new();

        for host in &self.config.probe_hosts {
            let start = Instant::now();
            match timeout(self.config.probe_timeout, TcpStream::connect(host.as_str())).await {
                Ok(Ok(_stream)) => {
                    latencies.push(start.elapsed().as_secs_f64() * 1000.0);
                }
                Ok(Err(e)) => debug!(host = %host, "Latency probe failed: {}", e),
                Err(_) => debug!(host = %host, "Latency probe timed out"),
            }
        }

        if latencies.is_empty() {
            return None;
        }
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new(SystemCollectorConfig::default())
    }
}

#[async_trait]
impl Collector for SystemCollector {
    async fn collect(&self) -> Vec<MetricSample> {
        let timestamp = Utc::now();
        let mut samples = self.cpu_and_memory().await;

        match self.disk_usage() {
            Ok(sample) => samples.push(sample),
            Err(e) => warn!("Failed to collect disk_usage: {}", e),
        }

        match self.disk_io_latency().await {
            Ok(Some(sample)) => samples.push(sample),
            Ok(None) => {}
            Err(e) => warn!("Failed to collect disk_io_latency: {}", e),
        }

        samples.extend(self.load_average());

        if let Some(latency) = self.network_latency().await {
            samples.push(self.config.thresholds.apply(
                "network_latency",
                MetricSample::new("network_latency", latency, "ms"),
            ));
        } else {
            debug!("All latency probes failed, network_latency omitted");
        }

        debug!(count = samples.len(), "System metrics collected");
        samples.into_iter().map(|s| s.at(timestamp)).collect()
    }

    fn name(&self) -> &str {
        "system"
    }
}
