//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, MonitorTarget, TomlConfigLoader};
use crate::error::{AppError, Result};
use crate::logging::{LogConfig, LoggingSystem};
use crate::probe::{ProbeDispatcher, ProbeResult};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                _ => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { verbose } = &args.command {
            self.validate_config_file(&args.get_config_path(), *verbose)
                .await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!("  日志级别: {}", config.global.log_level);
            println!("  最大并发: {}", config.global.max_concurrent_checks);
            println!("Globalping配置:");
            println!("  API地址: {}", config.globalping.base_url);
            println!("  请求超时: {}ms", config.globalping.request_timeout_ms);
            println!("  轮询间隔: {}ms", config.globalping.poll_interval_ms);

            println!("监控目标:");
            for (i, monitor) in config.monitors.iter().enumerate() {
                println!("  {}. {} [{}] ({})", i + 1, monitor.name, monitor.id, monitor.target);
                println!("     方法: {}", monitor.method);
                println!("     超时: {}ms", monitor.timeout);
                if let Some(codes) = &monitor.expected_codes {
                    println!("     期望状态码: {codes:?}");
                }
                println!(
                    "     检测方式: {}",
                    if monitor.check_proxy.is_some() {
                        "Globalping"
                    } else {
                        "本地"
                    }
                );
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个监控目标", config.monitors.len());
        }

        Ok(())
    }
}

/// 单个监控目标的检测报告
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// 监控目标ID
    pub id: String,
    /// 监控目标名称
    pub name: String,
    /// 检测结果
    #[serde(flatten)]
    pub result: ProbeResult,
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check {
            monitor,
            format,
            concurrency,
        } = &args.command
        {
            let reports = self
                .perform_check(args, monitor.as_deref(), *concurrency)
                .await?;
            self.print_reports(&reports, format)?;

            let down = reports.iter().filter(|r| !r.result.up).count();
            if down > 0 {
                return Err(AppError::Other(anyhow::anyhow!(
                    "{} 个监控目标状态异常",
                    down
                )));
            }
        }
        Ok(())
    }
}

impl CheckCommand {
    /// 加载配置并执行检测
    pub async fn perform_check(
        &self,
        args: &Args,
        monitor_id: Option<&str>,
        concurrency: Option<usize>,
    ) -> Result<Vec<CheckReport>> {
        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(args.get_config_path()).await?;

        let logging = LoggingSystem::new(LogConfig {
            level: args.effective_log_level(Some(&config)),
            json_format: args.json_logs,
            ..Default::default()
        });

        self.run_checks(&config, monitor_id, concurrency, &logging)
            .await
    }

    /// 对选中的监控目标执行一次检测
    async fn run_checks(
        &self,
        config: &Config,
        monitor_id: Option<&str>,
        concurrency: Option<usize>,
        logging: &LoggingSystem,
    ) -> Result<Vec<CheckReport>> {
        let monitors: Vec<MonitorTarget> = match monitor_id {
            Some(id) => config
                .monitors
                .iter()
                .filter(|m| m.id == id)
                .cloned()
                .collect(),
            None => config.monitors.clone(),
        };

        if monitors.is_empty() {
            return Err(AppError::Other(anyhow::anyhow!(
                "未找到ID为 '{}' 的监控目标",
                monitor_id.unwrap_or_default()
            )));
        }

        let dispatcher = ProbeDispatcher::from_config(config)?;
        let max_concurrent = concurrency.unwrap_or(config.global.max_concurrent_checks);
        let results = dispatcher.check_all(&monitors, max_concurrent).await;

        let reports = monitors
            .into_iter()
            .zip(results)
            .map(|(monitor, result)| {
                logging.probe_log(&monitor.id, &monitor.name, &result);
                CheckReport {
                    id: monitor.id,
                    name: monitor.name,
                    result,
                }
            })
            .collect();

        Ok(reports)
    }

    /// 按指定格式输出检测报告
    fn print_reports(&self, reports: &[CheckReport], format: &OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(reports)?);
            }
            OutputFormat::Table => self.print_table_results(reports),
            OutputFormat::Text => self.print_text_results(reports),
        }
        Ok(())
    }

    /// 打印文本格式结果
    fn print_text_results(&self, reports: &[CheckReport]) {
        for report in reports {
            let status_icon = if report.result.up { "✓" } else { "✗" };
            println!(
                "{} {} ({}) - {}ms",
                status_icon, report.name, report.id, report.result.ping
            );

            if let Some(location) = &report.result.location {
                println!("  位置: {location}");
            }
            if !report.result.up {
                println!("  错误: {}", report.result.err);
            }
        }
    }

    /// 打印表格格式结果
    fn print_table_results(&self, reports: &[CheckReport]) {
        println!(
            "{:<20} {:<10} {:<10} {:<20} {:<30}",
            "监控目标", "状态", "延迟", "位置", "错误信息"
        );
        println!("{}", "-".repeat(90));

        for report in reports {
            println!(
                "{:<20} {:<10} {:<10} {:<20} {:<30}",
                report.id,
                if report.result.up { "正常" } else { "异常" },
                format!("{}ms", report.result.ping),
                report.result.location.as_deref().unwrap_or("-"),
                report.result.err
            );
        }
    }
}
