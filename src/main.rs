//! Uptime Probe 主程序入口
//!
//! 对配置中的监控目标执行一次可用性检测

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use uptime_probe::cli::args::{Args, Commands};
use uptime_probe::cli::commands::{CheckCommand, Command, ValidateCommand, VersionCommand};
use uptime_probe::config::{ConfigLoader, TomlConfigLoader};
use uptime_probe::logging::{LogConfig, LoggingSystem};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 命令行未指定日志级别时读取配置文件中的设置，配置无法加载时由具体命令报告
    let config = if args.log_level.is_none() {
        TomlConfigLoader::new(true)
            .load_from_file(args.get_config_path())
            .await
            .ok()
    } else {
        None
    };

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.effective_log_level(config.as_ref()),
        console: true,
        json_format: args.json_logs,
        ..Default::default()
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Uptime Probe v{} 启动", uptime_probe::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
