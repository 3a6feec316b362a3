use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
///
/// 只有致命错误会走到这里；单个证书的失败在检索流程内部消化为 `FailureReason`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] DriverError),
    /// 输入表错误
    #[error("输入表错误: {0}")]
    Input(#[from] InputError),
    /// 压缩包写入错误
    #[error("压缩包错误: {0}")]
    Archive(#[from] ArchiveError),
    /// 上传错误
    #[error("上传错误: {0}")]
    Publish(#[from] PublishError),
    /// 工作目录错误
    #[error("工作目录错误: {0}")]
    Workspace(#[from] WorkspaceError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum DriverError {
    /// 浏览器配置失败
    #[error("浏览器配置失败: {message}")]
    ConfigurationFailed { message: String },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {message}")]
    LaunchFailed { message: String },
    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    NavigationFailed { url: String, message: String },
    /// 导航超时
    #[error("导航到 {url} 超时 ({timeout:?})")]
    NavigationTimedOut { url: String, timeout: Duration },
    /// 页面上找不到控件
    #[error("找不到控件: {selector}")]
    ElementNotFound { selector: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {message}")]
    ScriptExecutionFailed { message: String },
    /// 点击等交互失败
    #[error("页面交互失败: {message}")]
    InteractionFailed { message: String },
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::ScriptExecutionFailed {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::ScriptExecutionFailed {
            message: format!("脚本结果解析失败: {}", err),
        }
    }
}

/// 输入表错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 打开或读取输入表失败
    #[error("无法读取输入表 {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// 某一行无法解析
    #[error("输入表第 {row} 行无法解析: {source}")]
    MalformedRow {
        row: u64,
        #[source]
        source: csv::Error,
    },
}

/// 压缩包错误（致命，不会发布不完整的压缩包）
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 创建压缩包文件失败
    #[error("无法创建压缩包 {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 读取待打包文件失败
    #[error("无法读取待打包文件 {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入压缩包失败
    #[error("写入压缩包 {path} 失败: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    /// 后台打包任务异常退出
    #[error("打包任务异常退出: {message}")]
    TaskFailed { message: String },
}

/// 上传错误（只报告，不阻止清理）
#[derive(Debug, Error)]
pub enum PublishError {
    /// 读取本地压缩包失败
    #[error("无法读取待上传文件 {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },
    /// 对象存储请求失败
    #[error("上传到 {bucket}/{key} 失败: {message}")]
    UploadFailed {
        bucket: String,
        key: String,
        message: String,
    },
}

/// 单个资源的清理失败（永远不是致命错误）
#[derive(Debug, Error)]
#[error("无法删除 {path}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// 工作目录错误
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// 创建工作目录失败
    #[error("无法创建工作目录 {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 无法解析工作目录的绝对路径
    #[error("无法解析工作目录 {path}: {source}")]
    ResolveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 清理上次运行的残留文件失败
    #[error("工作目录 {path} 中存在无法删除的残留文件 ({count} 个)")]
    StaleEntries { path: PathBuf, count: usize },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 无法加载: {message}")]
    FileLoadFailed { path: PathBuf, message: String },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
    /// 压缩包名称不合法
    #[error("压缩包名称 '{name}' 不合法: {reason}")]
    InvalidArchiveName { name: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl DriverError {
    /// 创建浏览器启动错误
    pub fn launch_failed(message: impl ToString) -> Self {
        DriverError::LaunchFailed {
            message: message.to_string(),
        }
    }

    /// 创建导航错误
    pub fn navigation_failed(url: impl Into<String>, message: impl ToString) -> Self {
        DriverError::NavigationFailed {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

impl ConfigError {
    /// 创建配置值不合法错误
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
