//! 运行流水线 - 编排层
//!
//! 下载 → 打包 → 上传 → 清理
//!
//! - 单个证书失败不影响其他证书，也不阻止打包
//! - 打包失败是致命错误，不会上传，但仍然清理
//! - 上传失败只报告，仍然清理
//! - 清理总是执行且只执行一次

use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{error, info};

use crate::browser::PageDriver;
use crate::error::{AppResult, ConfigError, PublishError};
use crate::models::{BatchResult, Item};
use crate::orchestrator::batch_runner::run_batch_pooled;
use crate::services::{
    build_archive_in_background, ArchiveName, CleanupReport, Publisher, Workspace,
};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::RetrievalFlow;

/// 进程退出码：全部成功
pub const EXIT_SUCCESS: u8 = 0;
/// 进程退出码：部分证书下载失败
pub const EXIT_ITEM_FAILURES: u8 = 2;
/// 进程退出码：上传失败
pub const EXIT_UPLOAD_FAILED: u8 = 3;

/// 一次运行的结果
#[derive(Debug)]
pub struct PipelineReport {
    pub batch: BatchResult,
    pub archive_name: ArchiveName,
    /// 上传成功后的访问地址
    pub address: Option<String>,
    pub upload_error: Option<PublishError>,
    pub cleanup: CleanupReport,
}

impl PipelineReport {
    /// 上传失败优先于证书失败
    pub fn exit_code(&self) -> u8 {
        if self.upload_error.is_some() {
            EXIT_UPLOAD_FAILED
        } else if !self.batch.is_all_success() {
            EXIT_ITEM_FAILURES
        } else {
            EXIT_SUCCESS
        }
    }

    /// 输出最终结果：标准输出 + 日志
    pub fn print_summary(&self) {
        print_final_stats(
            self.batch.successes.len(),
            self.batch.failures.len(),
            self.batch.total(),
        );

        for failure in &self.batch.failures {
            error!("❌ 下载失败: {} ({})", failure, failure.reason);
        }
        match (&self.address, &self.upload_error) {
            (Some(address), _) => info!("✅ 压缩包地址: {}", address),
            (None, Some(e)) => error!("❌ {}", e),
            (None, None) => {}
        }
        for e in &self.cleanup.errors {
            error!("⚠️ 清理失败: {}", e);
        }

        if let Err(e) = self.write_summary(&mut io::stdout().lock()) {
            error!("无法输出运行结果: {}", e);
        }
    }

    /// 写出面向用户的结果
    ///
    /// 全部成功时只输出压缩包地址；否则输出失败列表，每行
    /// `Name: <name>, Download link: <link>`
    pub fn write_summary(&self, out: &mut impl Write) -> io::Result<()> {
        if let Some(e) = &self.upload_error {
            writeln!(out, "Upload failed: {}", e)?;
        }

        if self.batch.is_all_success() {
            if let Some(address) = &self.address {
                writeln!(out, "All certificates downloaded. Archive: {}", address)?;
            }
            return Ok(());
        }

        writeln!(out, "Failed downloads:")?;
        for failure in &self.batch.failures {
            writeln!(out, "{}", failure)?;
        }
        Ok(())
    }
}

/// 执行一次完整运行
///
/// # 参数
/// - `items`: 证书列表
/// - `workspace`: 已准备好的工作目录（由本函数负责清理）
/// - `drivers`: 浏览器会话，每个会话一个 worker
/// - `publisher`: 上传能力
/// - `archive_name`: 已确定的压缩包名称
/// - `flow`: 单个证书的检索流程
///
/// # 返回
/// 打包失败时返回错误（此时已完成清理），其余情况返回运行结果
pub async fn run_pipeline<D, P>(
    items: &[Item],
    workspace: Workspace,
    drivers: &[D],
    publisher: &P,
    archive_name: &ArchiveName,
    flow: &RetrievalFlow,
) -> AppResult<PipelineReport>
where
    D: PageDriver,
    P: Publisher + ?Sized,
{
    if drivers.is_empty() {
        let e = ConfigError::invalid("browser_sessions", "至少需要 1 个浏览器会话");
        return Err(e.into());
    }
    log_startup(items.len(), drivers.len(), archive_name.as_str());

    let batch = run_batch_pooled(items, workspace.path(), drivers, flow).await;

    let archive_path: PathBuf = match build_archive_in_background(
        workspace.path().to_path_buf(),
        archive_name.clone(),
        batch.successes.clone(),
    )
    .await
    {
        Ok(path) => path,
        Err(e) => {
            error!("❌ 打包失败，取消上传: {}", e);
            workspace.cleanup(None);
            return Err(e.into());
        }
    };

    let uploaded = publisher.upload(&archive_path, archive_name.as_str()).await;
    let (address, upload_error) = match uploaded {
        Ok(address) => (Some(address), None),
        Err(e) => {
            error!("❌ 上传失败: {}", e);
            (None, Some(e))
        }
    };

    let cleanup = workspace.cleanup(Some(&archive_path));

    Ok(PipelineReport {
        batch,
        archive_name: archive_name.clone(),
        address,
        upload_error,
        cleanup,
    })
}
