use perfwatch_types::MetricSample;

/// 根据采样给出优化建议（只给建议，不修改系统状态）
#[derive(Debug, Default)]
pub struct PerformanceOptimizer;

impl PerformanceOptimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, samples: &[MetricSample]) -> Vec<String> {
        samples.iter().filter_map(|s| self.advise(s)).collect()
    }

    /// 单条采样最多对应一条建议
    pub fn advise(&self, sample: &MetricSample) -> Option<String> {
        let name = sample.name.as_str();
        let value = sample.value;

        let (key, advice) = if name == "memory_usage" && value > 80.0 {
            (
                "high_memory_usage",
                "free memory by restarting long-running workers or reducing cache sizes",
            )
        } else if name == "cpu_usage" && value > 75.0 {
            (
                "high_cpu_usage",
                "lower the priority of background jobs or reduce collection frequency",
            )
        } else if name.starts_with("api_response_time") && value > 3000.0 {
            (
                "slow_api_response",
                "enable response caching and rate limiting for external API calls",
            )
        } else if name == "disk_usage" && value > 85.0 {
            (
                "high_disk_usage",
                "remove log files older than 7 days and profile dumps older than 3 days",
            )
        } else if name == "error_rate" && value > 5.0 {
            (
                "high_error_rate",
                "investigate the error log for recurring failure patterns",
            )
        } else {
            return None;
        };

        Some(format!("{}: {}", key, advice))
    }
}
