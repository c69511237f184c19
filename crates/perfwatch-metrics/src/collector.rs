use async_trait::async_trait;
use perfwatch_types::MetricSample;

/// 采集子步骤失败（单个探针失败只影响对应采样）
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Metric unavailable: {0}")]
    Unavailable(String),
}

/// 采集器接口
///
/// `collect` 不会整体失败：子步骤的错误在内部记录日志，
/// 返回其余成功的采样。
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self) -> Vec<MetricSample>;

    fn name(&self) -> &str;
}
