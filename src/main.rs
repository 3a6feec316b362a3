use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use certificate_archiver::utils::logging;
use certificate_archiver::{App, ArchiveName, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 先确定压缩包名称，名称不合法时不产生任何文件
    let requested = requested_archive_name(&config)?;
    let archive_name = ArchiveName::resolve_now(requested.as_deref())?;

    // 初始化日志
    let log_file = logging::init(&config.log_directory)?;
    info!("日志文件: {}", log_file.display());

    // 运行应用
    let report = App::new(config).run(&archive_name).await?;
    report.print_summary();

    Ok(ExitCode::from(report.exit_code()))
}

/// 压缩包名称来源：命令行参数 → ARCHIVE_NAME → 终端输入 → 无（使用时间戳）
fn requested_archive_name(config: &Config) -> Result<Option<String>> {
    if let Some(arg) = std::env::args().nth(1) {
        return Ok(Some(arg));
    }
    if let Some(name) = &config.archive_name {
        return Ok(Some(name.clone()));
    }
    if !io::stdin().is_terminal() {
        return Ok(None);
    }

    print!("请输入压缩包名称（留空使用时间戳）: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("读取压缩包名称失败")?;
    Ok(Some(line))
}
