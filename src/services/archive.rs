//! 压缩包服务 - 业务能力层
//!
//! 只负责"把下载成功的文件打成一个 zip"，不关心下载和上传

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{ArchiveError, ConfigError};

/// 压缩包扩展名
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// 已确定的压缩包文件名（总是带 `.zip` 后缀）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName(String);

impl ArchiveName {
    /// 根据用户输入确定压缩包名称
    ///
    /// - 输入为空：`certificates_<YYYY-MM-DD-HH-MM-SS>.zip`
    /// - 缺少 `.zip` 后缀：自动补上
    /// - 包含路径分隔符：拒绝
    pub fn resolve(requested: Option<&str>, now: NaiveDateTime) -> Result<Self, ConfigError> {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());

        let Some(name) = requested else {
            return Ok(Self(format!(
                "certificates_{}{}",
                now.format("%Y-%m-%d-%H-%M-%S"),
                ARCHIVE_EXTENSION
            )));
        };

        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::InvalidArchiveName {
                name: name.to_string(),
                reason: "不能包含路径".to_string(),
            });
        }

        if name.to_ascii_lowercase().ends_with(ARCHIVE_EXTENSION) {
            Ok(Self(name.to_string()))
        } else {
            Ok(Self(format!("{}{}", name, ARCHIVE_EXTENSION)))
        }
    }

    /// 使用当前本地时间确定压缩包名称
    pub fn resolve_now(requested: Option<&str>) -> Result<Self, ConfigError> {
        Self::resolve(requested, chrono::Local::now().naive_local())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 压缩包内的文件名：与输入路径一致，统一使用 `/`，去掉根目录和 `.`、`..`
pub fn member_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 把下载成功的文件打包到 `working_dir/<name>`
///
/// 文件时间戳固定，同样的输入文件总是得到完全相同的压缩包。
/// 失败时删除写了一半的压缩包。
pub fn build_archive(
    working_dir: &Path,
    name: &ArchiveName,
    success_paths: &[PathBuf],
) -> Result<PathBuf, ArchiveError> {
    let archive_path = working_dir.join(name.as_str());

    match write_archive(&archive_path, success_paths) {
        Ok(count) => {
            info!(
                "📦 压缩包已创建: {} ({} 个文件)",
                archive_path.display(),
                count
            );
            Ok(archive_path)
        }
        Err(e) => {
            if archive_path.exists() {
                if let Err(remove_err) = fs::remove_file(&archive_path) {
                    warn!(
                        "无法删除不完整的压缩包 {}: {}",
                        archive_path.display(),
                        remove_err
                    );
                }
            }
            Err(e)
        }
    }
}

/// 在后台线程中打包
pub async fn build_archive_in_background(
    working_dir: PathBuf,
    name: ArchiveName,
    success_paths: Vec<PathBuf>,
) -> Result<PathBuf, ArchiveError> {
    tokio::task::spawn_blocking(move || build_archive(&working_dir, &name, &success_paths))
        .await
        .map_err(|e| ArchiveError::TaskFailed {
            message: e.to_string(),
        })?
}

fn write_archive(archive_path: &Path, success_paths: &[PathBuf]) -> Result<usize, ArchiveError> {
    let write_failed = |source: ZipError| ArchiveError::WriteFailed {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::create(archive_path).map_err(|source| ArchiveError::CreateFailed {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut seen = HashSet::new();
    for path in success_paths {
        let name = member_name(path);
        if !seen.insert(name.clone()) {
            warn!("重复的文件已跳过: {}", path.display());
            continue;
        }

        let mut source = File::open(path).map_err(|source| ArchiveError::SourceUnreadable {
            path: path.clone(),
            source,
        })?;
        writer.start_file(name, options).map_err(write_failed)?;
        io::copy(&mut source, &mut writer).map_err(|e| write_failed(ZipError::Io(e)))?;
    }

    writer.finish().map_err(write_failed)?;
    Ok(seen.len())
}
