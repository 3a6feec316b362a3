//! 证书检索流程 - 流程层
//!
//! 核心职责：定义"一个证书"的完整下载流程
//!
//! 每次尝试的顺序：
//! 1. 打开下载页面（有超时）
//! 2. 等待下载按钮出现（有超时）
//! 3. 短暂等待页面初始化，然后点击按钮
//! 4. 按固定间隔检查下载目录中是否出现文件
//!
//! 任何一步失败都只消耗一次尝试，不会向上抛出错误；
//! 每个证书最终都得到且只得到一个 `RetrievalOutcome`。

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::browser::PageDriver;
use crate::error::DriverError;
use crate::models::{FailureReason, Item, RetrievalOutcome};
use crate::utils::logging::truncate_text;
use crate::utils::{poll_until, PollSchedule};
use crate::workflow::item_ctx::ItemCtx;

/// 检索流程的时间参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    /// 每个证书的最大尝试次数
    pub max_attempts: u32,
    /// 页面导航超时
    pub navigation_timeout: Duration,
    /// 等待下载按钮出现的超时
    pub trigger_timeout: Duration,
    /// 检查下载按钮的间隔
    pub trigger_poll_interval: Duration,
    /// 按钮出现后、点击前的等待
    pub settle_delay: Duration,
    /// 检查下载文件的间隔
    pub download_poll_interval: Duration,
    /// 检查下载文件的次数
    pub download_poll_count: u32,
    /// 下载文件的后缀
    pub download_suffix: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            navigation_timeout: Duration::from_secs(30),
            trigger_timeout: Duration::from_secs(10),
            trigger_poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_secs(1),
            download_poll_interval: Duration::from_secs(1),
            download_poll_count: 10,
            download_suffix: ".png".to_string(),
        }
    }
}

/// 证书检索流程
///
/// - 不持有浏览器资源，驱动由调用方传入
/// - 不删除任何文件，失败留下的残留交给清理阶段
pub struct RetrievalFlow {
    settings: RetrievalSettings,
}

impl RetrievalFlow {
    /// 创建新的检索流程
    pub fn new(settings: RetrievalSettings) -> Self {
        Self { settings }
    }

    /// 下载单个证书
    ///
    /// # 参数
    /// - `driver`: 页面驱动（独占使用）
    /// - `item`: 证书
    /// - `working_dir`: 浏览器下载文件所在目录
    /// - `ctx`: 日志上下文
    pub async fn run<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        item: &Item,
        working_dir: &Path,
        ctx: &ItemCtx,
    ) -> RetrievalOutcome {
        let Some(file_name) = item.expected_file_name(&self.settings.download_suffix) else {
            error!(
                "{} ❌ 下载链接无法推导文件名: {}",
                ctx, item.download_link
            );
            return RetrievalOutcome::failed(item, FailureReason::InvalidDownloadLink);
        };
        let expected_path = working_dir.join(&file_name);

        info!("{} 开始下载: {}", ctx, item.name);

        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_reason = FailureReason::DownloadTimeout;

        for attempt in 1..=max_attempts {
            match self.attempt(driver, item, &expected_path, ctx).await {
                Ok(path) => {
                    info!(
                        "{} ✓ 下载完成: {} (第 {}/{} 次尝试)",
                        ctx, file_name, attempt, max_attempts
                    );
                    return RetrievalOutcome::Succeeded {
                        local_file_path: path,
                    };
                }
                Err(reason) => {
                    if attempt < max_attempts {
                        warn!(
                            "{} ⚠️ 第 {}/{} 次尝试失败: {}，重试...",
                            ctx, attempt, max_attempts, reason
                        );
                    } else {
                        warn!(
                            "{} ⚠️ 第 {}/{} 次尝试失败: {}",
                            ctx, attempt, max_attempts, reason
                        );
                    }
                    last_reason = reason;
                }
            }
        }

        error!(
            "{} ❌ {} 的证书在 {} 次尝试后仍未下载成功 ({})",
            ctx, item.name, max_attempts, last_reason
        );
        RetrievalOutcome::failed(item, last_reason)
    }

    /// 单次尝试：导航 → 等待按钮 → 点击 → 等待文件
    async fn attempt<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        item: &Item,
        expected_path: &Path,
        ctx: &ItemCtx,
    ) -> Result<PathBuf, FailureReason> {
        let url = item.download_link.trim();

        match timeout(self.settings.navigation_timeout, driver.navigate(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(FailureReason::NavigationError(e.to_string())),
            Err(_) => {
                let e = DriverError::NavigationTimedOut {
                    url: url.to_string(),
                    timeout: self.settings.navigation_timeout,
                };
                return Err(FailureReason::NavigationError(e.to_string()));
            }
        }
        info!("{} 已打开页面: {}", ctx, truncate_text(url, 80));

        let trigger_schedule = PollSchedule::within(
            self.settings.trigger_timeout,
            self.settings.trigger_poll_interval,
        );
        // 检查次数和总时长都有上限，页面响应慢时也不会超过 trigger_timeout
        let visible = match timeout(
            self.settings.trigger_timeout,
            poll_until(&trigger_schedule, || driver.trigger_visible()),
        )
        .await
        {
            Ok(result) => result.map_err(|e| FailureReason::NavigationError(e.to_string()))?,
            Err(_) => false,
        };
        if !visible {
            return Err(FailureReason::TriggerNotFound);
        }
        debug!("{} 找到下载按钮", ctx);

        // 按钮可见后页面脚本可能还没绑定好事件
        sleep(self.settings.settle_delay).await;

        if expected_path.exists() {
            warn!(
                "{} ⚠️ {} 在点击前已存在，可能与其他证书的下载链接重名",
                ctx,
                expected_path.display()
            );
        }

        driver
            .activate_trigger()
            .await
            .map_err(|e| FailureReason::NavigationError(e.to_string()))?;

        info!(
            "{} 等待 {} 下载完成...",
            ctx,
            expected_path.display()
        );

        let download_schedule = PollSchedule::every(
            self.settings.download_poll_interval,
            self.settings.download_poll_count,
        );
        let found = poll_until(&download_schedule, || async {
            Ok::<_, Infallible>(expected_path.exists())
        })
        .await
        .unwrap_or_else(|never| match never {});

        if found {
            Ok(expected_path.to_path_buf())
        } else {
            Err(FailureReason::DownloadTimeout)
        }
    }
}

/// 使用默认时间参数下载单个证书
pub async fn retrieve<D: PageDriver + ?Sized>(
    item: &Item,
    working_dir: &Path,
    driver: &D,
    max_attempts: u32,
) -> RetrievalOutcome {
    let flow = RetrievalFlow::new(RetrievalSettings {
        max_attempts,
        ..RetrievalSettings::default()
    });
    let ctx = ItemCtx::new(1, 1, item.id.clone(), 1);
    flow.run(driver, item, working_dir, &ctx).await
}
