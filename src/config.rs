use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::workflow::RetrievalSettings;

/// 指定配置文件路径的环境变量
pub const CONFIG_FILE_ENV: &str = "CERT_ARCHIVER_CONFIG";
/// 未指定时尝试加载的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 程序配置
///
/// 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// S3 存储桶名称
    pub s3_bucket_name: String,
    /// S3 存储桶所在区域，同时用于拼接下载地址
    pub s3_bucket_location: String,
    /// 下载文件和压缩包的临时工作目录
    pub download_directory: PathBuf,
    /// 证书列表 CSV 路径
    pub csv_file_path: PathBuf,
    /// 压缩包名称（为空时使用时间戳）
    pub archive_name: Option<String>,
    /// 每个证书的最大尝试次数
    pub max_attempts: u32,
    /// 页面导航超时（秒）
    pub navigation_timeout_secs: u64,
    /// 等待下载按钮出现的超时（秒）
    pub trigger_timeout_secs: u64,
    /// 检查下载按钮的间隔（毫秒）
    pub trigger_poll_interval_ms: u64,
    /// 按钮出现后点击前的等待（毫秒）
    pub settle_delay_ms: u64,
    /// 检查下载文件的间隔（毫秒）
    pub download_poll_interval_ms: u64,
    /// 检查下载文件的次数
    pub download_poll_count: u32,
    /// 下载文件的后缀
    pub download_suffix: String,
    /// 下载按钮上的文字
    pub trigger_label: String,
    /// 同时打开的浏览器会话数
    pub browser_sessions: usize,
    /// Chrome 可执行文件路径（为空时自动查找）
    pub chrome_executable: Option<PathBuf>,
    /// 是否以无头模式运行
    pub headless: bool,
    /// 日志文件目录
    pub log_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            s3_bucket_name: "test-bucket".to_string(),
            s3_bucket_location: "eu-north-1".to_string(),
            download_directory: PathBuf::from("temp"),
            csv_file_path: PathBuf::from("certificates.csv"),
            archive_name: None,
            max_attempts: 3,
            navigation_timeout_secs: 30,
            trigger_timeout_secs: 10,
            trigger_poll_interval_ms: 500,
            settle_delay_ms: 1000,
            download_poll_interval_ms: 1000,
            download_poll_count: 10,
            download_suffix: ".png".to_string(),
            trigger_label: "As Image".to_string(),
            browser_sessions: 1,
            chrome_executable: None,
            headless: true,
            log_directory: PathBuf::from("."),
        }
    }
}

impl Config {
    /// 从配置文件和环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };

        let config = base.with_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 只从环境变量加载（以默认值为基础）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 通过自定义查找函数加载，便于测试注入
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self::default().with_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileLoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::FileLoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// 用环境变量覆盖当前配置
    pub fn with_overrides(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = EnvReader { lookup: &lookup };
        Ok(Self {
            s3_bucket_name: env.string("S3_BUCKET_NAME").unwrap_or(self.s3_bucket_name),
            s3_bucket_location: env
                .string("S3_BUCKET_LOCATION")
                .unwrap_or(self.s3_bucket_location),
            download_directory: env
                .string("DOWNLOAD_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(self.download_directory),
            csv_file_path: env
                .string("CSV_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(self.csv_file_path),
            archive_name: env.string("ARCHIVE_NAME").or(self.archive_name),
            max_attempts: env.parse("MAX_ATTEMPTS", "u32")?.unwrap_or(self.max_attempts),
            navigation_timeout_secs: env
                .parse("NAVIGATION_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.navigation_timeout_secs),
            trigger_timeout_secs: env
                .parse("TRIGGER_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.trigger_timeout_secs),
            trigger_poll_interval_ms: env
                .parse("TRIGGER_POLL_INTERVAL_MS", "u64")?
                .unwrap_or(self.trigger_poll_interval_ms),
            settle_delay_ms: env
                .parse("SETTLE_DELAY_MS", "u64")?
                .unwrap_or(self.settle_delay_ms),
            download_poll_interval_ms: env
                .parse("DOWNLOAD_POLL_INTERVAL_MS", "u64")?
                .unwrap_or(self.download_poll_interval_ms),
            download_poll_count: env
                .parse("DOWNLOAD_POLL_COUNT", "u32")?
                .unwrap_or(self.download_poll_count),
            download_suffix: env.string("DOWNLOAD_SUFFIX").unwrap_or(self.download_suffix),
            trigger_label: env.string("TRIGGER_LABEL").unwrap_or(self.trigger_label),
            browser_sessions: env
                .parse("BROWSER_SESSIONS", "usize")?
                .unwrap_or(self.browser_sessions),
            chrome_executable: env
                .string("CHROME_EXECUTABLE")
                .map(PathBuf::from)
                .or(self.chrome_executable),
            headless: env.parse("HEADLESS", "bool")?.unwrap_or(self.headless),
            log_directory: env
                .string("LOG_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(self.log_directory),
        })
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "至少需要尝试 1 次"));
        }
        if self.download_poll_count == 0 {
            return Err(ConfigError::invalid("download_poll_count", "至少需要检查 1 次"));
        }
        if self.trigger_poll_interval_ms == 0 || self.download_poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval", "轮询间隔不能为 0"));
        }
        if self.browser_sessions == 0 {
            return Err(ConfigError::invalid(
                "browser_sessions",
                "至少需要 1 个浏览器会话",
            ));
        }
        if self.s3_bucket_name.trim().is_empty() {
            return Err(ConfigError::invalid("s3_bucket_name", "不能为空"));
        }
        if self.trigger_label.trim().is_empty() {
            return Err(ConfigError::invalid("trigger_label", "不能为空"));
        }
        self.validate_download_directory()
    }

    /// 工作目录在运行前后会被整体清空，不能包含输入表、日志目录或当前目录
    fn validate_download_directory(&self) -> Result<(), ConfigError> {
        let download_dir = resolve_path(&self.download_directory);

        let protected = [
            (self.csv_file_path.clone(), "不能包含证书列表文件"),
            (self.log_directory.clone(), "不能包含日志目录"),
        ];
        for (path, reason) in protected {
            if resolve_path(&path).starts_with(&download_dir) {
                return Err(ConfigError::invalid("download_directory", reason));
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            if resolve_path(&cwd).starts_with(&download_dir) {
                return Err(ConfigError::invalid(
                    "download_directory",
                    "不能是当前目录或它的上级目录",
                ));
            }
        }
        Ok(())
    }

    /// 单个证书检索流程使用的时间参数
    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            max_attempts: self.max_attempts,
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            trigger_timeout: Duration::from_secs(self.trigger_timeout_secs),
            trigger_poll_interval: Duration::from_millis(self.trigger_poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            download_poll_interval: Duration::from_millis(self.download_poll_interval_ms),
            download_poll_count: self.download_poll_count,
            download_suffix: self.download_suffix.clone(),
        }
    }
}

/// 转换为绝对路径并去掉 `.`、`..`；已存在的部分解析符号链接
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    let mut existing = normalized.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

struct EnvReader<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<'_, F> {
    /// 读取非空字符串
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
        match self.string(name) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::EnvVarParseFailed {
                    var_name: name.to_string(),
                    value,
                    expected_type: expected_type.to_string(),
                }),
        }
    }
}
