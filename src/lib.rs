//! # Certificate Archiver
//!
//! 批量下载证书图片，打包成 zip 并上传到对象存储
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Browser）
//! - `infrastructure/` - `JsExecutor`，唯一的 page owner，提供 eval() 能力
//! - `browser/` - 启动 Chrome，`PageDriver` 抽象导航 / 检查按钮 / 点击
//!
//! ### ② 业务能力层（Services）
//! - `ArchiveName` / `build_archive` - 打包能力
//! - `Publisher` / `S3Publisher` - 上传能力
//! - `Workspace` / `cleanup` - 工作目录准备与清理
//!
//! ### ③ 流程层（Workflow）
//! - `ItemCtx` - 日志上下文（证书序号 + 会话编号）
//! - `RetrievalFlow` - 单个证书的下载流程（带重试）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_runner` - 顺序 / 会话池批量下载
//! - `orchestrator/pipeline` - 下载 → 打包 → 上传 → 清理
//! - `orchestrator/batch_processor` - 资源准备与释放
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{ChromeDriver, PageDriver};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{BatchResult, FailureReason, Item, RetrievalFailure, RetrievalOutcome};
pub use orchestrator::{run_batch, run_batch_pooled, run_pipeline, App, PipelineReport};
pub use services::{build_archive, cleanup, ArchiveName, CleanupReport, Publisher, Workspace};
pub use workflow::{retrieve, ItemCtx, RetrievalFlow, RetrievalSettings};
