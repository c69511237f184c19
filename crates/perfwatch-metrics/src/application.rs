use crate::collector::{Collector, CollectorError};
use crate::thresholds::ThresholdTable;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone, Utc};
use perfwatch_types::MetricSample;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const RECENT_EXECUTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    Get,
    Post,
}

/// 外部 API 延迟探针
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiProbe {
    /// 指标名为 `api_response_time_{name}`
    pub name: String,
    pub method: ProbeMethod,
    pub url: String,

    /// 存放令牌的环境变量
    #[serde(default)]
    pub token_env: Option<String>,

    /// `Authorization` 头的前缀，如 `Bearer`、`token`
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    #[serde(default)]
    pub body: Option<serde_json::Value>,

    /// 视为可用的状态码
    #[serde(default = "default_accepted_statuses")]
    pub accepted_statuses: Vec<u16>,

    /// 未配置令牌时跳过探测
    #[serde(default)]
    pub require_token: bool,
}

fn default_auth_scheme() -> String {
    "Bearer".to_string()
}

fn default_accepted_statuses() -> Vec<u16> {
    vec![200]
}

impl ApiProbe {
    pub fn linear() -> Self {
        Self {
            name: "linear".to_string(),
            method: ProbeMethod::Post,
            url: "https://api.linear.app/graphql".to_string(),
            token_env: Some("LINEAR_API_KEY".to_string()),
            auth_scheme: "Bearer".to_string(),
            body: Some(json!({ "query": "query { viewer { id } }" })),
            accepted_statuses: vec![200],
            require_token: true,
        }
    }

    pub fn github() -> Self {
        Self {
            name: "github".to_string(),
            method: ProbeMethod::Get,
            url: "https://api.github.com/user".to_string(),
            token_env: Some("GITHUB_TOKEN".to_string()),
            auth_scheme: "token".to_string(),
            body: None,
            // 无令牌时 401 也说明服务可达
            accepted_statuses: vec![200, 401],
            require_token: false,
        }
    }

    pub fn metric_name(&self) -> String {
        format!("api_response_time_{}", self.name)
    }

    pub fn defaults() -> Vec<ApiProbe> {
        vec![Self::linear(), Self::github()]
    }
}

/// 应用采集器配置
#[derive(Debug, Clone)]
pub struct ApplicationCollectorConfig {
    /// 脚本执行耗时日志
    pub performance_log: PathBuf,
    /// 错误日志
    pub error_log: PathBuf,
    pub api_probes: Vec<ApiProbe>,
    pub api_timeout: Duration,
    pub thresholds: ThresholdTable,
}

impl Default for ApplicationCollectorConfig {
    fn default() -> Self {
        Self {
            performance_log: PathBuf::from("performance_log.json"),
            error_log: PathBuf::from("error_log.json"),
            api_probes: ApiProbe::defaults(),
            api_timeout: Duration::from_secs(10),
            thresholds: ThresholdTable::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScriptLog {
    #[serde(default)]
    pub script_execution_times: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorLog {
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
    #[serde(default = "default_total_operations")]
    pub total_operations_last_hour: u64,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

fn default_total_operations() -> u64 {
    100
}

/// 解析错误日志时间：RFC 3339，或不带时区的本地时间
fn parse_log_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

/// 每个脚本最近 10 次执行的平均耗时
pub fn script_samples(log: &ScriptLog, thresholds: &ThresholdTable) -> Vec<MetricSample> {
    log.script_execution_times
        .iter()
        .filter(|(_, times)| !times.is_empty())
        .map(|(script, times)| {
            let recent = &times[times.len().saturating_sub(RECENT_EXECUTIONS)..];
            let mean = recent.iter().sum::<f64>() / recent.len() as f64;
            let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
            let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            thresholds.apply(
                "script_execution_time",
                MetricSample::new(format!("script_execution_time_{}", script), mean, "seconds")
                    .with_metadata(json!({
                        "script_name": script,
                        "recent_executions": recent.len(),
                        "min_time": min,
                        "max_time": max,
                    })),
            )
        })
        .collect()
}

/// 最近一小时错误数 / 最近一小时操作总数 * 100
pub fn error_rate_sample(log: &ErrorLog, now: DateTime<Utc>, thresholds: &ThresholdTable) -> MetricSample {
    let one_hour_ago = now - ChronoDuration::hours(1);
    let recent: Vec<&ErrorEntry> = log
        .errors
        .iter()
        .filter(|e| matches!(parse_log_timestamp(&e.timestamp), Some(ts) if ts > one_hour_ago))
        .collect();

    let total = log.total_operations_last_hour;
    let rate = if total > 0 {
        recent.len() as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let error_types: BTreeSet<&str> = recent
        .iter()
        .map(|e| e.error_type.as_deref().unwrap_or("unknown"))
        .collect();

    thresholds.apply(
        "error_rate",
        MetricSample::new("error_rate", rate, "percent").with_metadata(json!({
            "recent_errors": recent.len(),
            "total_operations": total,
            "error_types": error_types,
        })),
    )
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, CollectorError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(path).await?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// 应用层指标采集器：脚本耗时、API 延迟、进程内存、错误率
pub struct ApplicationCollector {
    client: reqwest::Client,
    system: Mutex<System>,
    config: ApplicationCollectorConfig,
}

impl ApplicationCollector {
    pub fn new(config: ApplicationCollectorConfig) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .build()?;

        Ok(Self {
            client,
            system: Mutex::new(System::new()),
            config,
        })
    }

    async fn script_metrics(&self) -> Result<Vec<MetricSample>, CollectorError> {
        let log: Option<ScriptLog> = read_json(&self.config.performance_log).await?;
        Ok(log
            .map(|log| script_samples(&log, &self.config.thresholds))
            .unwrap_or_default())
    }

    async fn error_rate(&self) -> Result<Option<MetricSample>, CollectorError> {
        let log: Option<ErrorLog> = read_json(&self.config.error_log).await?;
        Ok(log.map(|log| error_rate_sample(&log, Utc::now(), &self.config.thresholds)))
    }

    /// 探测一次 API，返回耗时（毫秒）；不可用时返回 `None`
    pub async fn probe_api(&self, probe: &ApiProbe) -> Result<Option<f64>, CollectorError> {
        let token = probe
            .token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|t| !t.is_empty());

        if probe.require_token && token.is_none() {
            debug!(api = %probe.name, "No API token configured, skipping probe");
            return Ok(None);
        }

        let mut request = match probe.method {
            ProbeMethod::Get => self.client.get(&probe.url),
            ProbeMethod::Post => self.client.post(&probe.url),
        };
        if let Some(token) = token {
            request = request.header("Authorization", format!("{} {}", probe.auth_scheme, token));
        }
        if let Some(body) = &probe.body {
            request = request.json(body);
        }

        let start = Instant::now();
        let response = request.send().await?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = response.status().as_u16();
        if probe.accepted_statuses.contains(&status) {
            Ok(Some(elapsed_ms))
        } else {
            debug!(api = %probe.name, status, "API probe returned unexpected status");
            Ok(None)
        }
    }

    async fn api_metrics(&self) -> Vec<MetricSample> {
        let mut samples = Vec::new();

        for probe in &self.config.api_probes {
            match self.probe_api(probe).await {
                Ok(Some(elapsed_ms)) => samples.push(self.config.thresholds.apply(
                    "api_response_time",
                    MetricSample::new(probe.metric_name(), elapsed_ms, "ms")
                        .with_metadata(json!({ "api": probe.name })),
                )),
                Ok(None) => {}
                Err(e) => warn!(api = %probe.name, "Failed to test API: {}", e),
            }
        }

        samples
    }

    async fn process_memory(&self) -> Result<MetricSample, CollectorError> {
        let pid = sysinfo::get_current_pid().map_err(|e| CollectorError::Unavailable(e.to_string()))?;

        let mut system = self.system.lock().await;
        system.refresh_process(pid);
        let process = system
            .process(pid)
            .ok_or_else(|| CollectorError::Unavailable(format!("process {} not found", pid)))?;

        let rss_mb = process.memory() as f64 / BYTES_PER_MB;
        let vms_mb = process.virtual_memory() as f64 / BYTES_PER_MB;

        Ok(self.config.thresholds.apply(
            "memory_usage_mb",
            MetricSample::new("memory_usage_mb", rss_mb, "MB").with_metadata(json!({
                "pid": pid.as_u32(),
                "rss_mb": (rss_mb * 100.0).round() / 100.0,
                "vms_mb": (vms_mb * 100.0).round() / 100.0,
            })),
        ))
    }
}

#[async_trait]
impl Collector for ApplicationCollector {
    async fn collect(&self) -> Vec<MetricSample> {
        let timestamp = Utc::now();
        let mut samples = Vec::new();

        match self.script_metrics().await {
            Ok(scripts) => samples.extend(scripts),
            Err(e) => warn!("Failed to load script performance data: {}", e),
        }

        samples.extend(self.api_metrics().await);

        match self.process_memory().await {
            Ok(sample) => samples.push(sample),
            Err(e) => warn!("Failed to get application memory usage: {}", e),
        }

        match self.error_rate().await {
            Ok(Some(sample)) => samples.push(sample),
            Ok(None) => {}
            Err(e) => warn!("Failed to calculate error rate: {}", e),
        }

        debug!(count = samples.len(), "Application metrics collected");
        samples.into_iter().map(|s| s.at(timestamp)).collect()
    }

    fn name(&self) -> &str {
        "application"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_script_samples_use_last_ten() {
        let mut log = ScriptLog::default();
        let times: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        log.script_execution_times.insert("sync".to_string(), times);
        log.script_execution_times.insert("idle".to_string(), vec![]);

        let samples = script_samples(&log, &ThresholdTable::default());
        assert_eq!(samples.len(), 1);

        let sample = &samples[0];
        assert_eq!(sample.name, "script_execution_time_sync");
        assert_eq!(sample.value, 7.5);
        assert_eq!(sample.threshold_warning, Some(30.0));
        let metadata = sample.metadata.as_ref().unwrap();
        assert_eq!(metadata["recent_executions"], 10);
        assert_eq!(metadata["min_time"], 3.0);
        assert_eq!(metadata["max_time"], 12.0);
    }

    #[test]
    fn test_error_rate_counts_last_hour() {
        let now = Utc::now();
        let log = ErrorLog {
            errors: vec![
                ErrorEntry {
                    timestamp: (now - ChronoDuration::minutes(5)).to_rfc3339(),
                    error_type: Some("timeout".to_string()),
                },
                ErrorEntry {
                    timestamp: (now - ChronoDuration::minutes(50)).to_rfc3339(),
                    error_type: None,
                },
                ErrorEntry {
                    timestamp: (now - ChronoDuration::hours(3)).to_rfc3339(),
                    error_type: Some("old".to_string()),
                },
                ErrorEntry {
                    timestamp: "not a date".to_string(),
                    error_type: Some("garbage".to_string()),
                },
            ],
            total_operations_last_hour: 20,
        };

        let sample = error_rate_sample(&log, now, &ThresholdTable::default());
        assert_eq!(sample.value, 10.0);
        assert_eq!(sample.threshold_critical, Some(10.0));
        let metadata = sample.metadata.unwrap();
        assert_eq!(metadata["recent_errors"], 2);
        assert_eq!(metadata["error_types"], json!(["timeout", "unknown"]));
    }

    #[test]
    fn test_error_rate_zero_operations() {
        let log: ErrorLog = serde_json::from_str(
            r#"{"errors": [{"timestamp": "2020-01-01T00:00:00"}], "total_operations_last_hour": 0}"#,
        )
        .unwrap();
        let sample = error_rate_sample(&log, Utc::now(), &ThresholdTable::default());
        assert_eq!(sample.value, 0.0);
    }

    #[test]
    fn test_naive_local_timestamp() {
        let local = Local::now().naive_local() - ChronoDuration::minutes(1);
        let raw = local.format("%Y-%m-%dT%H:%M:%S%.f").to_string();
        let parsed = parse_log_timestamp(&raw).unwrap();
        assert!((Utc::now() - parsed) < ChronoDuration::minutes(2));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_omitted() {
        let collector = ApplicationCollector::new(ApplicationCollectorConfig {
            performance_log: PathBuf::from("/nonexistent/performance_log.json"),
            error_log: PathBuf::from("/nonexistent/error_log.json"),
            api_probes: vec![ApiProbe {
                name: "local".to_string(),
                method: ProbeMethod::Get,
                url: "http://127.0.0.1:1/health".to_string(),
                token_env: None,
                auth_scheme: default_auth_scheme(),
                body: None,
                accepted_statuses: default_accepted_statuses(),
                require_token: false,
            }],
            api_timeout: Duration::from_secs(2),
            thresholds: ThresholdTable::default(),
        })
        .unwrap();

        let samples = collector.collect().await;
        assert!(samples.iter().all(|s| s.name != "api_response_time_local"));
        assert!(samples.iter().all(|s| s.name != "error_rate"));
        assert!(samples.iter().any(|s| s.name == "memory_usage_mb"));
    }

    #[tokio::test]
    async fn test_missing_token_skips_probe() {
        let collector = ApplicationCollector::new(ApplicationCollectorConfig::default()).unwrap();
        let probe = ApiProbe {
            token_env: Some("PERFWATCH_TEST_TOKEN_THAT_IS_NEVER_SET".to_string()),
            ..ApiProbe::linear()
        };
        assert_eq!(collector.probe_api(&probe).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reads_log_files() {
        let mut perf = NamedTempFile::new().unwrap();
        write!(perf, r#"{{"script_execution_times": {{"deploy": [40.0, 50.0]}}}}"#).unwrap();
        let mut errors = NamedTempFile::new().unwrap();
        write!(errors, r#"{{"errors": []}}"#).unwrap();

        let collector = ApplicationCollector::new(ApplicationCollectorConfig {
            performance_log: perf.path().to_path_buf(),
            error_log: errors.path().to_path_buf(),
            api_probes: vec![],
            ..Default::default()
        })
        .unwrap();

        let samples = collector.collect().await;
        let deploy = samples
            .iter()
            .find(|s| s.name == "script_execution_time_deploy")
            .unwrap();
        assert_eq!(deploy.value, 45.0);
        assert_eq!(deploy.breach(), Some(perfwatch_types::AlertType::Warning));

        let rate = samples.iter().find(|s| s.name == "error_rate").unwrap();
        assert_eq!(rate.value, 0.0);
    }
}
