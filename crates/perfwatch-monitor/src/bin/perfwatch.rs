use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perfwatch_metrics::{
    ApplicationCollector, LogNotifier, PerformanceOptimizer, SystemCollector, ThresholdEvaluator,
    WebhookNotifier,
};
use perfwatch_monitor::{generate_report, init_tracing, LogFormat, MonitorConfig, MonitorService};
use perfwatch_store::{MetricStore, SqliteMetricStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Performance monitoring for development workflow integrations")]
struct Args {
    /// TOML 配置文件
    #[arg(long, global = true, default_value = "config/perfwatch.toml")]
    config: PathBuf,

    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动监控循环，直到收到 SIGINT/SIGTERM
    Start {
        /// 采集间隔（秒）
        #[arg(long)]
        interval: Option<u64>,
    },
    /// 只执行一个周期并输出健康快照
    Once,
    /// 输出最近一段时间的性能报告
    Report {
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = MonitorConfig::load(Some(&args.config));
    let log_format = args
        .log_format
        .or_else(|| loaded.as_ref().ok().map(|c| c.log_format))
        .unwrap_or_default();
    init_tracing(log_format)?;

    let mut config = loaded.unwrap_or_else(|e| {
        warn!("Failed to load configuration ({:#}), using defaults", e);
        MonitorConfig::default()
    });

    let store: Arc<dyn MetricStore> = Arc::new(
        SqliteMetricStore::connect(&config.database_url)
            .await
            .with_context(|| format!("cannot initialize store at {}", config.database_url))?,
    );

    match args.command {
        Command::Start { interval } => {
            if let Some(secs) = interval {
                config.interval_secs = secs;
            }
            let service = Arc::new(build_service(&config, store)?);
            service.start().await;

            wait_for_shutdown().await?;
            service.stop().await;
        }
        Command::Once => {
            let service = build_service(&config, store)?;
            let outcome = service.run_cycle().await?;
            println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
        }
        Command::Report { hours } => {
            let report = generate_report(store.as_ref(), hours, &PerformanceOptimizer::new()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn build_service(config: &MonitorConfig, store: Arc<dyn MetricStore>) -> Result<MonitorService> {
    let mut evaluator = ThresholdEvaluator::new(store.clone())
        .with_cooldown(config.cooldown())
        .with_notifier(Box::new(LogNotifier));

    if let Some(url) = &config.webhook_url {
        let webhook = WebhookNotifier::new(url.clone(), Duration::from_secs(config.api_timeout_secs))?;
        evaluator.register_notifier(Box::new(webhook));
    }

    let application = ApplicationCollector::new(config.application_collector_config())?;

    Ok(MonitorService::new(store, evaluator)
        .with_collector(Box::new(SystemCollector::new(config.system_collector_config())))
        .with_collector(Box::new(application))
        .with_interval(config.interval())
        .with_stop_timeout(config.stop_timeout()))
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C");
    Ok(())
}
