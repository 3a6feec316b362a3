/// 日志工具模块
///
/// 提供日志初始化以及格式化输出的辅助函数
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志：控制台 + 日志文件
///
/// # 参数
/// - `log_directory`: 日志文件所在目录
///
/// # 返回
/// 返回日志文件路径
pub fn init(log_directory: &Path) -> Result<PathBuf> {
    fs::create_dir_all(log_directory)
        .with_context(|| format!("无法创建日志目录: {}", log_directory.display()))?;

    let log_file_path = log_directory.join(format!(
        "download_logs_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = init_log_file(&log_file_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("日志系统初始化失败")?;

    Ok(log_file_path)
}

/// 创建日志文件并写入文件头
fn init_log_file(log_file_path: &Path) -> Result<File> {
    let mut file = File::create(log_file_path)
        .with_context(|| format!("无法创建日志文件: {}", log_file_path.display()))?;
    let log_header = format!(
        "{}\n证书下载日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    file.write_all(log_header.as_bytes())?;
    Ok(file)
}

/// 记录程序启动信息
pub fn log_startup(total_items: usize, sessions: usize, archive_name: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 证书批量下载");
    info!("📄 待下载证书: {}", total_items);
    info!("🌐 浏览器会话数: {}", sessions);
    info!("📦 压缩包名称: {}", archive_name);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `success`: 成功数量
/// - `total`: 总数
pub fn log_batch_complete(success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 下载阶段完成: 成功 {}/{}", success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
pub fn print_final_stats(success: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
