/// 日志工具模块
///
/// 初始化 tracing（控制台 + 文件），并提供批次横幅等格式化输出
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

/// 初始化日志
///
/// - 控制台与文件两路输出，`RUST_LOG` 优先于 `level`
/// - 文件写入 `<log_dir>/<YYYYmmddTHHMM>.log`
///
/// # 返回
/// 返回文件写入线程的 guard 和日志文件路径，guard 必须存活到程序结束
pub fn init(log_dir: &Path, level: &str) -> Result<(WorkerGuard, PathBuf)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("无法创建日志目录: {}", log_dir.display()))?;

    let file_name = format!("{}.log", chrono::Local::now().format("%Y%m%dT%H%M"));
    let log_path = log_dir.join(&file_name);
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &file_name));

    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_filter(filter()),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(filter()),
        )
        .try_init()
        .context("日志系统已经初始化")?;

    Ok((guard, log_path))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, total: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量声明提交");
    info!("📄 输入文件: {}", config.batch_file.display());
    info!("📊 待提交声明: {} 条", total);
    info!("📁 下载目录: {}", config.download_dir.display());
    info!("{}", "=".repeat(60));
}

/// 记录分组（输入行）开始信息
///
/// # 参数
/// - `row`: 行号（从 1 开始）
/// - `total_rows`: 总行数
/// - `declarations`: 本行声明数量
pub fn log_group_start(row: usize, total_rows: usize, declarations: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 行", row, total_rows);
    info!("📄 本行声明: {} 条", declarations);
    info!("{}", "=".repeat(60));
}

/// 记录分组完成信息
pub fn log_group_complete(row: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 行完成: 成功 {}/{}", row, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `report`: 批次台账路径
/// - `log_dir`: 日志目录
pub fn print_final_stats(success: usize, failed: usize, report: &Path, log_dir: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, success + failed);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n结果报告: {}", report.display());
    info!("日志目录: {}", log_dir.display());
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
