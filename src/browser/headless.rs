use std::path::{Path, PathBuf};

use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::DriverError;

/// 浏览器启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
}

/// 启动好的浏览器会话
pub struct LaunchedBrowser {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
}

/// 启动浏览器，并把下载目录指向 `download_dir`
///
/// `download_dir` 必须是绝对路径，Chrome 不接受相对路径。
pub async fn launch_browser(
    options: &LaunchOptions,
    download_dir: &Path,
) -> Result<LaunchedBrowser, DriverError> {
    info!("🚀 启动浏览器 (无头模式: {})...", options.headless);
    debug!("下载目录: {}", download_dir.display());

    let mut builder = BrowserConfig::builder().args(vec![
        "--disable-gpu",           // 无头模式必须禁用 GPU
        "--no-sandbox",            // 容器内运行时没有沙盒权限
        "--disable-dev-shm-usage", // 防止共享内存不足
    ]);
    builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &options.chrome_executable {
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        DriverError::ConfigurationFailed { message: e }
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        DriverError::launch_failed(e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let download_behavior = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(download_dir.to_string_lossy().to_string())
        .build()
        .map_err(|e| DriverError::ConfigurationFailed { message: e })?;
    browser.execute(download_behavior).await.map_err(|e| {
        error!("设置下载目录失败: {}", e);
        DriverError::ConfigurationFailed {
            message: format!("设置下载目录失败: {}", e),
        }
    })?;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        DriverError::launch_failed(e)
    })?;

    info!("✅ 浏览器已就绪");

    Ok(LaunchedBrowser {
        browser,
        handler_task,
        page,
    })
}
