//! 浏览器驱动能力边界
//!
//! 流程层只依赖这里的 trait，不直接接触 chromiumoxide，
//! 测试时用脚本化的假门户替换

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Selector;

/// 一个浏览器会话提供的能力
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// 页面元素句柄
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// 在 `wait` 内轮询查找元素，超时返回 `Ok(None)`
    async fn find_element(
        &self,
        selector: &Selector,
        wait: Duration,
    ) -> Result<Option<Self::Element>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// 清空输入框后输入文本
    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<()>;

    /// 元素的可见文本
    async fn text(&self, element: &Self::Element) -> Result<String>;

    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn current_url(&self) -> Result<Option<String>>;

    /// 关闭会话，释放浏览器进程
    async fn close(&mut self) -> Result<()>;
}

/// 为每条声明打开一个全新的浏览器会话
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: BrowserDriver;

    async fn open(&self) -> Result<Self::Driver>;
}
