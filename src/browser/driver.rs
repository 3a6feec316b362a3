//! 页面下载驱动
//!
//! 检索流程只通过 `PageDriver` 操作浏览器：导航、检查下载按钮、点击下载按钮。
//! 一个驱动实例对应一个浏览器会话，同一时间只能有一个导航 / 交互在进行。

use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::Browser;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::headless::{launch_browser, LaunchOptions};
use crate::error::DriverError;
use crate::infrastructure::js_executor::{visibility_script, JsExecutor};

/// 页面下载驱动
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 导航到指定 URL
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// 下载按钮当前是否可见
    async fn trigger_visible(&self) -> Result<bool, DriverError>;

    /// 点击下载按钮，浏览器随后把文件写入下载目录
    async fn activate_trigger(&self) -> Result<(), DriverError>;
}

/// 按钮文字对应的 XPath
pub fn trigger_xpath(label: &str) -> String {
    format!("//button[contains(text(), '{}')]", label.replace('\'', ""))
}

/// 基于 chromiumoxide 的驱动
pub struct ChromeDriver {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    executor: JsExecutor,
    trigger_xpath: String,
}

impl ChromeDriver {
    /// 启动一个新的浏览器会话
    ///
    /// # 参数
    /// - `options`: 启动参数
    /// - `download_dir`: 浏览器下载目录（绝对路径）
    /// - `trigger_label`: 下载按钮上的文字
    pub async fn launch(
        options: &LaunchOptions,
        download_dir: &Path,
        trigger_label: &str,
    ) -> Result<Self, DriverError> {
        let launched = launch_browser(options, download_dir).await?;
        Ok(Self {
            browser: Mutex::new(launched.browser),
            handler_task: launched.handler_task,
            executor: JsExecutor::new(launched.page),
            trigger_xpath: trigger_xpath(trigger_label),
        })
    }

    /// 关闭浏览器
    pub async fn shutdown(self) {
        let mut browser = self.browser.into_inner();
        if let Err(e) = browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.handler_task.abort();
        info!("浏览器已关闭");
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.executor
            .page()
            .goto(url)
            .await
            .map_err(|e| DriverError::navigation_failed(url, e))?;
        Ok(())
    }

    async fn trigger_visible(&self) -> Result<bool, DriverError> {
        let script = visibility_script(&self.trigger_xpath)?;
        self.executor.eval_as::<bool>(script).await
    }

    async fn activate_trigger(&self) -> Result<(), DriverError> {
        let button = self
            .executor
            .page()
            .find_xpath(self.trigger_xpath.as_str())
            .await
            .map_err(|e| {
                debug!("查找下载按钮失败: {}", e);
                DriverError::ElementNotFound {
                    selector: self.trigger_xpath.clone(),
                }
            })?;

        button
            .click()
            .await
            .map_err(|e| DriverError::InteractionFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }
}
