//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **准备资源**：工作目录、证书列表、浏览器会话、上传客户端
//! 2. **委托执行**：交给 `pipeline::run_pipeline` 完成下载 → 打包 → 上传 → 清理
//! 3. **释放资源**：清理完成后关闭所有浏览器
//!
//! 准备阶段任何一步失败都会先清理工作目录，再返回错误。

use std::path::Path;

use tracing::{error, info};

use crate::browser::{ChromeDriver, LaunchOptions};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{load_items, Item};
use crate::orchestrator::pipeline::{run_pipeline, PipelineReport};
use crate::services::{ArchiveName, S3Publisher, Workspace};
use crate::workflow::RetrievalFlow;

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 运行应用主逻辑
    ///
    /// # 参数
    /// - `archive_name`: 已确定的压缩包名称
    pub async fn run(&self, archive_name: &ArchiveName) -> AppResult<PipelineReport> {
        let workspace = Workspace::prepare(&self.config.download_directory)?;

        let (items, drivers) = match self.setup(&workspace).await {
            Ok(resources) => resources,
            Err(e) => {
                error!("❌ 初始化失败: {}", e);
                workspace.cleanup(None);
                return Err(e);
            }
        };

        let publisher =
            S3Publisher::new(&self.config.s3_bucket_name, &self.config.s3_bucket_location).await;
        let flow = RetrievalFlow::new(self.config.retrieval_settings());

        let result = run_pipeline(
            &items,
            workspace,
            &drivers,
            &publisher,
            archive_name,
            &flow,
        )
        .await;

        for driver in drivers {
            driver.shutdown().await;
        }
        result
    }

    /// 加载证书列表并启动浏览器会话
    async fn setup(&self, workspace: &Workspace) -> AppResult<(Vec<Item>, Vec<ChromeDriver>)> {
        let download_dir = workspace.absolute_path()?;

        info!("\n📁 正在读取证书列表...");
        let items = load_items(&self.config.csv_file_path)?;

        // 会话数不需要超过证书数
        let sessions = self.config.browser_sessions.min(items.len()).max(1);
        let drivers = self.launch_drivers(sessions, &download_dir).await?;

        Ok((items, drivers))
    }

    /// 启动浏览器会话，任何一个失败都关闭已启动的会话
    async fn launch_drivers(
        &self,
        sessions: usize,
        download_dir: &Path,
    ) -> AppResult<Vec<ChromeDriver>> {
        let options = LaunchOptions {
            headless: self.config.headless,
            chrome_executable: self.config.chrome_executable.clone(),
        };

        let mut drivers = Vec::with_capacity(sessions);
        for session in 1..=sessions {
            match ChromeDriver::launch(&options, download_dir, &self.config.trigger_label).await {
                Ok(driver) => {
                    info!("✓ 浏览器会话#{} 已就绪", session);
                    drivers.push(driver);
                }
                Err(e) => {
                    error!("❌ 浏览器会话#{} 启动失败: {}", session, e);
                    for driver in drivers {
                        driver.shutdown().await;
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(drivers)
    }
}
