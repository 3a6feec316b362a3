//! 集成测试共用的驱动和上传实现
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use certificate_archiver::error::{DriverError, PublishError};
use certificate_archiver::services::object_url;
use certificate_archiver::{Item, PageDriver, Publisher};
use tokio::time::sleep;

pub const BUCKET: &str = "test-bucket";
pub const REGION: &str = "eu-north-1";

/// 某个下载链接在页面上的表现
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// 按钮出现，点击后文件写入下载目录
    Normal,
    /// 按钮永远不出现
    NeverShowsTrigger,
    /// 按钮出现，但点击后没有文件
    NeverDownloads,
    /// 导航总是失败
    NavigationFails,
    /// 从第 n 次导航开始正常
    SucceedsOnAttempt(u32),
    /// 点击后写入的是同名目录，打包时无法读取
    WritesDirectory,
}

/// 所有会话共享的页面脚本和导航计数
#[derive(Default)]
pub struct Script {
    behaviors: HashMap<String, Behavior>,
    navigations: Mutex<HashMap<String, u32>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item: &Item, behavior: Behavior) -> Self {
        self.behaviors.insert(item.download_link.clone(), behavior);
        self
    }

    pub fn navigations(&self, item: &Item) -> u32 {
        self.navigations
            .lock()
            .unwrap()
            .get(&item.download_link)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_navigations(&self) -> u32 {
        self.navigations.lock().unwrap().values().sum()
    }

    fn behavior(&self, url: &str) -> Behavior {
        self.behaviors.get(url).copied().unwrap_or(Behavior::Normal)
    }
}

/// 按脚本行动的浏览器会话
pub struct ScriptedDriver {
    download_dir: PathBuf,
    script: Arc<Script>,
    current_url: Mutex<Option<String>>,
    session_navigations: AtomicU32,
}

impl ScriptedDriver {
    pub fn new(download_dir: &Path, script: Arc<Script>) -> Self {
        Self {
            download_dir: download_dir.to_path_buf(),
            script,
            current_url: Mutex::new(None),
            session_navigations: AtomicU32::new(0),
        }
    }

    /// 本会话执行过的导航次数
    pub fn session_navigations(&self) -> u32 {
        self.session_navigations.load(Ordering::SeqCst)
    }

    fn current(&self) -> (String, Behavior, u32) {
        let url = self.current_url.lock().unwrap().clone().unwrap_or_default();
        let behavior = self.script.behavior(&url);
        let count = self
            .script
            .navigations
            .lock()
            .unwrap()
            .get(&url)
            .copied()
            .unwrap_or(0);
        (url, behavior, count)
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.session_navigations.fetch_add(1, Ordering::SeqCst);
        *self
            .script
            .navigations
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;
        *self.current_url.lock().unwrap() = Some(url.to_string());

        sleep(Duration::from_millis(200)).await;

        if self.script.behavior(url) == Behavior::NavigationFails {
            return Err(DriverError::navigation_failed(url, "net::ERR_NAME_NOT_RESOLVED"));
        }
        Ok(())
    }

    async fn trigger_visible(&self) -> Result<bool, DriverError> {
        let (_, behavior, count) = self.current();
        Ok(match behavior {
            Behavior::NeverShowsTrigger | Behavior::NavigationFails => false,
            Behavior::SucceedsOnAttempt(n) => count >= n,
            _ => true,
        })
    }

    async fn activate_trigger(&self) -> Result<(), DriverError> {
        let (url, behavior, _) = self.current();
        let file_name = format!("{}.png", url.rsplit('/').next().unwrap_or_default());
        let target = self.download_dir.join(file_name);
        match behavior {
            Behavior::NeverDownloads => {}
            Behavior::WritesDirectory => std::fs::create_dir_all(&target).unwrap(),
            _ => std::fs::write(&target, format!("certificate for {}", url)).unwrap(),
        }
        Ok(())
    }
}

/// 记录上传内容的实现；上传时读取压缩包字节，清理之后仍可检查
#[derive(Default)]
pub struct RecordingPublisher {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingPublisher {
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    /// 唯一一次上传的压缩包中的文件名（排序后）
    pub fn single_archive_members(&self) -> Vec<String> {
        let uploads = self.uploads();
        assert_eq!(uploads.len(), 1, "应该恰好上传一次");
        let archive = zip::ZipArchive::new(Cursor::new(uploads[0].1.clone())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn upload(
        &self,
        local_path: &Path,
        destination_name: &str,
    ) -> Result<String, PublishError> {
        let bytes = std::fs::read(local_path).map_err(|e| PublishError::ReadFailed {
            path: local_path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.uploads
            .lock()
            .unwrap()
            .push((destination_name.to_string(), bytes));
        Ok(object_url(REGION, BUCKET, destination_name))
    }
}

/// 总是上传失败
#[derive(Default)]
pub struct FailingPublisher {
    pub attempts: AtomicU32,
}

#[async_trait]
impl Publisher for FailingPublisher {
    async fn upload(
        &self,
        _local_path: &Path,
        destination_name: &str,
    ) -> Result<String, PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PublishError::UploadFailed {
            bucket: BUCKET.to_string(),
            key: destination_name.to_string(),
            message: "AccessDenied".to_string(),
        })
    }
}

/// 测试用证书，下载链接以 `slug` 结尾
pub fn item(id: u32, slug: &str) -> Item {
    Item {
        id: id.to_string(),
        download_link: format!("https://certs.example.com/c/{}", slug),
        verification_link: format!("https://certs.example.com/v/{}", slug),
        name: format!("Student {}", id),
    }
}
