//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 准备工作目录、证书列表、浏览器会话和上传客户端
//! - 准备失败时清理工作目录
//! - 运行结束后关闭浏览器
//!
//! ### `pipeline` - 运行流水线
//! - 下载 → 打包 → 上传 → 清理
//! - 汇总结果和退出码
//!
//! ### `batch_runner` - 批量下载
//! - 顺序模式：一个浏览器会话逐个处理
//! - 会话池模式：每个会话一个 worker
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (持有 Browser / Workspace)
//!     ↓
//! pipeline (下载 → 打包 → 上传 → 清理)
//!     ↓
//! batch_runner (处理 Vec<Item>)
//!     ↓
//! workflow::RetrievalFlow (处理单个 Item)
//!     ↓
//! browser::PageDriver / services (archive / publisher / workspace)
//! ```

pub mod batch_processor;
pub mod batch_runner;
pub mod pipeline;

// 重新导出主要类型
pub use batch_processor::App;
pub use batch_runner::{run_batch, run_batch_pooled};
pub use pipeline::{run_pipeline, PipelineReport};
