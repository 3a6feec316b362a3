//! 上传服务 - 业务能力层
//!
//! 把压缩包上传到对象存储，返回可访问的地址

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::PublishError;

/// 压缩包的 Content-Type
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// 上传能力
#[async_trait]
pub trait Publisher: Send + Sync {
    /// 上传本地文件
    ///
    /// # 参数
    /// - `local_path`: 本地文件路径
    /// - `destination_name`: 存储中的对象名
    ///
    /// # 返回
    /// 上传后对象的访问地址
    async fn upload(
        &self,
        local_path: &Path,
        destination_name: &str,
    ) -> Result<String, PublishError>;
}

/// 对象访问地址：`https://s3-<region>.amazonaws.com/<bucket>/<key>`
pub fn object_url(region: &str, bucket: &str, key: &str) -> String {
    format!("https://s3-{}.amazonaws.com/{}/{}", region, bucket, key)
}

/// 基于 aws-sdk-s3 的上传实现
///
/// 凭证由 SDK 默认链提供（环境变量、配置文件、实例角色等）
pub struct S3Publisher {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Publisher {
    /// 创建上传客户端
    pub async fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        let region = region.into();
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        Self {
            client: Client::new(&shared_config),
            bucket: bucket.into(),
            region,
        }
    }
}

#[async_trait]
impl Publisher for S3Publisher {
    async fn upload(
        &self,
        local_path: &Path,
        destination_name: &str,
    ) -> Result<String, PublishError> {
        debug!(
            "上传 {} -> s3://{}/{}",
            local_path.display(),
            self.bucket,
            destination_name
        );

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| PublishError::ReadFailed {
                path: local_path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(destination_name)
            .content_type(ARCHIVE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::UploadFailed {
                bucket: self.bucket.clone(),
                key: destination_name.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let address = object_url(&self.region, &self.bucket, destination_name);
        info!("☁️ 上传完成: {}", address);
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_region_bucket_and_key() {
        assert_eq!(
            object_url("eu-north-1", "test-bucket", "batch.zip"),
            "https://s3-eu-north-1.amazonaws.com/test-bucket/batch.zip"
        );
    }
}
