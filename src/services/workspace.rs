//! 工作目录服务 - 业务能力层
//!
//! 工作目录在运行开始时准备好，运行结束时（无论成功与否）连同压缩包一起删除。
//! 删除失败只记录，不会中断清理。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{CleanupError, WorkspaceError};

/// 清理结果
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// 已删除的路径
    pub removed: Vec<PathBuf>,
    /// 删除失败的路径
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, path: &Path, result: std::io::Result<()>) {
        match result {
            Ok(()) => {
                debug!("已删除: {}", path.display());
                self.removed.push(path.to_path_buf());
            }
            Err(source) => {
                let error = CleanupError {
                    path: path.to_path_buf(),
                    source,
                };
                warn!("⚠️ {}", error);
                self.errors.push(error);
            }
        }
    }
}

/// 删除压缩包（如果存在）、工作目录中的所有文件以及工作目录本身
///
/// 每个删除失败都会被记录，然后继续处理下一个。
pub fn cleanup(working_dir: &Path, archive_path: Option<&Path>) -> CleanupReport {
    let mut report = CleanupReport::default();

    if let Some(archive) = archive_path {
        if archive.exists() {
            report.record(archive, fs::remove_file(archive));
        }
    }

    if !working_dir.exists() {
        debug!("工作目录不存在，无需清理: {}", working_dir.display());
        return report;
    }

    clear_entries(working_dir, &mut report);
    report.record(working_dir, fs::remove_dir(working_dir));
    report
}

fn clear_entries(dir: &Path, report: &mut CleanupReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.record(dir, Err(e));
            return;
        }
    };

    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                let result = if is_dir {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                report.record(&path, result);
            }
            Err(e) => report.record(dir, Err(e)),
        }
    }
}

/// 本次运行的工作目录
///
/// 如果没有显式调用 [`Workspace::cleanup`]，在释放时自动清理
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    reclaimed: bool,
}

impl Workspace {
    /// 准备工作目录：不存在则创建，存在则清空上次运行的残留
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let path = path.into();

        if path.is_dir() {
            let mut report = CleanupReport::default();
            clear_entries(&path, &mut report);
            if !report.removed.is_empty() {
                info!(
                    "已清理上次运行残留的 {} 个文件: {}",
                    report.removed.len(),
                    path.display()
                );
            }
            if !report.is_clean() {
                return Err(WorkspaceError::StaleEntries {
                    path,
                    count: report.errors.len(),
                });
            }
        }

        fs::create_dir_all(&path).map_err(|source| WorkspaceError::CreateFailed {
            path: path.clone(),
            source,
        })?;
        debug!("工作目录已就绪: {}", path.display());

        Ok(Self {
            path,
            reclaimed: false,
        })
    }

    /// 配置中的（可能是相对的）工作目录路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 工作目录的绝对路径（交给浏览器作为下载目录）
    pub fn absolute_path(&self) -> Result<PathBuf, WorkspaceError> {
        fs::canonicalize(&self.path).map_err(|source| WorkspaceError::ResolveFailed {
            path: self.path.clone(),
            source,
        })
    }

    /// 删除压缩包和工作目录
    pub fn cleanup(mut self, archive_path: Option<&Path>) -> CleanupReport {
        self.reclaim(archive_path)
    }

    fn reclaim(&mut self, archive_path: Option<&Path>) -> CleanupReport {
        self.reclaimed = true;
        let report = cleanup(&self.path, archive_path);
        if report.is_clean() {
            info!("🧹 清理完成，共删除 {} 项", report.removed.len());
        } else {
            warn!(
                "⚠️ 清理完成，{} 项无法删除",
                report.errors.len()
            );
        }
        report
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.reclaimed {
            warn!("工作目录未被显式清理，释放时回收: {}", self.path.display());
            self.reclaim(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("temp");

        let workspace = Workspace::prepare(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(workspace.path(), dir.as_path());
        workspace.cleanup(None);
    }

    #[test]
    fn prepare_clears_leftovers() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("temp");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("old.png"), b"old").unwrap();
        fs::write(dir.join("nested").join("older.png"), b"older").unwrap();

        let workspace = Workspace::prepare(&dir).unwrap();

        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        workspace.cleanup(None);
    }

    #[test]
    fn cleanup_removes_archive_and_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("temp");
        let workspace = Workspace::prepare(&dir).unwrap();
        fs::write(dir.join("a.png"), b"a").unwrap();
        fs::create_dir(dir.join("partial")).unwrap();
        fs::write(dir.join("partial").join("b.crdownload"), b"b").unwrap();
        let archive = root.path().join("batch.zip");
        fs::write(&archive, b"zip").unwrap();

        let report = workspace.cleanup(Some(&archive));

        assert!(report.is_clean());
        assert!(!archive.exists());
        assert!(!dir.exists());
        assert_eq!(report.removed.len(), 4);
    }

    #[test]
    fn missing_archive_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("temp");
        fs::create_dir(&dir).unwrap();

        let report = cleanup(&dir, Some(&root.path().join("never-built.zip")));

        assert!(report.is_clean());
        assert!(!dir.exists());
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();

        let report = cleanup(&root.path().join("gone"), None);

        assert!(report.is_clean());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn failures_are_recorded_and_cleanup_continues() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("temp");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.png"), b"a").unwrap();
        // 目录不能用 remove_file 删除
        let not_a_file = root.path().join("looks-like.zip");
        fs::create_dir(&not_a_file).unwrap();

        let report = cleanup(&dir, Some(&not_a_file));

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, not_a_file);
        assert!(!dir.exists());
    }

    #[test]
    fn dropping_workspace_reclaims_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("temp");

        {
            let _workspace = Workspace::prepare(&dir).unwrap();
            fs::write(dir.join("a.png"), b"a").unwrap();
        }

        assert!(!dir.exists());
    }
}
