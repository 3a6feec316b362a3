use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// 一条待下载的证书（输入表中的一行）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub id: String,
    pub download_link: String,
    /// 仅供记录，检索流程不使用
    pub verification_link: String,
    pub name: String,
}

impl Item {
    /// 点击下载按钮后浏览器写入的文件名：链接最后一段 + 固定后缀
    ///
    /// 查询串和锚点会被去掉；链接没有可用的最后一段时返回 `None`。
    pub fn expected_file_name(&self, suffix: &str) -> Option<String> {
        let link = self.download_link.trim();
        let link = link.split(['?', '#']).next().unwrap_or(link);
        let segment = link.trim_end_matches('/').rsplit('/').next()?;

        if segment.is_empty() || segment.contains(':') || segment == "." || segment == ".." {
            return None;
        }
        Some(format!("{}{}", segment, suffix))
    }
}

/// 单个证书下载失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 超时内下载按钮始终没有出现
    TriggerNotFound,
    /// 点击后文件始终没有出现
    DownloadTimeout,
    /// 浏览器或网络错误
    NavigationError(String),
    /// 下载链接无法推导出文件名
    InvalidDownloadLink,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::TriggerNotFound => write!(f, "未找到下载按钮"),
            FailureReason::DownloadTimeout => write!(f, "等待下载超时"),
            FailureReason::NavigationError(msg) => write!(f, "浏览器错误: {}", msg),
            FailureReason::InvalidDownloadLink => write!(f, "下载链接无法推导文件名"),
        }
    }
}

/// 失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalFailure {
    pub name: String,
    pub url: String,
    pub reason: FailureReason,
}

impl fmt::Display for RetrievalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name: {}, Download link: {}", self.name, self.url)
    }
}

/// 单个证书的检索结果，每个证书恰好产生一个
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Succeeded { local_file_path: PathBuf },
    Failed(RetrievalFailure),
}

impl RetrievalOutcome {
    pub fn failed(item: &Item, reason: FailureReason) -> Self {
        RetrievalOutcome::Failed(RetrievalFailure {
            name: item.name.clone(),
            url: item.download_link.clone(),
            reason,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetrievalOutcome::Succeeded { .. })
    }
}

/// 一次运行的全部结果，按成功 / 失败分开保存，各自保持输入顺序
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub successes: Vec<PathBuf>,
    pub failures: Vec<RetrievalFailure>,
}

impl BatchResult {
    pub fn record(&mut self, outcome: RetrievalOutcome) {
        match outcome {
            RetrievalOutcome::Succeeded { local_file_path } => self.successes.push(local_file_path),
            RetrievalOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_all_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl FromIterator<RetrievalOutcome> for BatchResult {
    fn from_iter<I: IntoIterator<Item = RetrievalOutcome>>(iter: I) -> Self {
        let mut result = BatchResult::default();
        for outcome in iter {
            result.record(outcome);
        }
        result
    }
}
