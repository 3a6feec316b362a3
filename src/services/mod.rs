//! 业务能力层
//!
//! - `archive`：把下载成功的文件打包成 zip
//! - `publisher`：把压缩包上传到对象存储
//! - `workspace`：工作目录的准备与清理

pub mod archive;
pub mod publisher;
pub mod workspace;

pub use archive::{build_archive, build_archive_in_background, ArchiveName};
pub use publisher::{object_url, Publisher, S3Publisher};
pub use workspace::{cleanup, CleanupReport, Workspace};
