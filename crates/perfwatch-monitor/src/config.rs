use crate::logging::LogFormat;
use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use perfwatch_metrics::{
    ApiProbe, ApplicationCollectorConfig, SystemCollectorConfig, Threshold, ThresholdTable,
    DEFAULT_COOLDOWN_MINUTES,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 监控服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 采集间隔（秒）
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// 告警冷却（分钟）
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,

    /// 停止时等待当前周期结束的上限（秒）
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_performance_log")]
    pub performance_log: PathBuf,

    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,

    /// 网络延迟探测目标（host:port）
    #[serde(default = "default_probe_hosts")]
    pub probe_hosts: Vec<String>,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    #[serde(default = "ApiProbe::defaults")]
    pub api_probes: Vec<ApiProbe>,

    /// 覆盖默认阈值，键为指标族名
    #[serde(default)]
    pub thresholds: HashMap<String, Threshold>,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_cooldown_minutes() -> i64 {
    DEFAULT_COOLDOWN_MINUTES
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_database_url() -> String {
    "sqlite://performance.db?mode=rwc".to_string()
}

fn default_performance_log() -> PathBuf {
    PathBuf::from("performance_log.json")
}

fn default_error_log() -> PathBuf {
    PathBuf::from("error_log.json")
}

fn default_probe_hosts() -> Vec<String> {
    SystemCollectorConfig::default().probe_hosts
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_api_timeout_secs() -> u64 {
    10
}

impl MonitorConfig {
    /// 加载配置：TOML 文件（可缺省），再由 `PERFWATCH_*` 环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow!("Invalid config path: {:?}", path))?;
            builder = builder.add_source(File::new(path, FileFormat::Toml).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("PERFWATCH")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("probe_hosts"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cooldown_minutes)
    }

    pub fn threshold_table(&self) -> ThresholdTable {
        ThresholdTable::with_overrides(&self.thresholds)
    }

    pub fn system_collector_config(&self) -> SystemCollectorConfig {
        SystemCollectorConfig {
            probe_hosts: self.probe_hosts.clone(),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            thresholds: self.threshold_table(),
            ..SystemCollectorConfig::default()
        }
    }

    pub fn application_collector_config(&self) -> ApplicationCollectorConfig {
        ApplicationCollectorConfig {
            performance_log: self.performance_log.clone(),
            error_log: self.error_log.clone(),
            api_probes: self.api_probes.clone(),
            api_timeout: Duration::from_secs(self.api_timeout_secs),
            thresholds: self.threshold_table(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            cooldown_minutes: default_cooldown_minutes(),
            stop_timeout_secs: default_stop_timeout_secs(),
            database_url: default_database_url(),
            performance_log: default_performance_log(),
            error_log: default_error_log(),
            probe_hosts: default_probe_hosts(),
            probe_timeout_secs: default_probe_timeout_secs(),
            api_timeout_secs: default_api_timeout_secs(),
            api_probes: ApiProbe::defaults(),
            thresholds: HashMap::new(),
            webhook_url: None,
            log_format: LogFormat::default(),
        }
    }
}
