use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// 直接下载生成的文档，绕开浏览器的下载管理器
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// 非 2xx 状态视为错误
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// 基于 reqwest 的下载器
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .build()
            .context("无法创建 HTTP 客户端")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("请求失败: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("服务器返回状态码 {}", status);
        }

        let bytes = response.bytes().await.context("读取响应内容失败")?;
        debug!("下载完成: {} 字节", bytes.len());
        Ok(bytes.to_vec())
    }
}
