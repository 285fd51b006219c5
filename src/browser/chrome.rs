use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::browser::driver::{BrowserDriver, DriverFactory};
use crate::config::Config;
use crate::models::Selector;

/// 查找元素时的轮询间隔
const FIND_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 启动浏览器的参数
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    headless: bool,
}

impl ChromeLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            executable: config.browser_executable.clone(),
            headless: config.browser_headless,
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder();
        builder = if self.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }

        builder
            .args(vec![
                "--incognito",              // 每条声明都是独立的无痕会话
                "--disable-popup-blocking",
                "--no-sandbox",
                "--disable-dev-shm-usage",
            ])
            .build()
            .map_err(|e| {
                error!("配置浏览器失败: {}", e);
                anyhow::anyhow!("配置浏览器失败: {}", e)
            })
    }
}

#[async_trait]
impl DriverFactory for ChromeLauncher {
    type Driver = ChromeDriver;

    async fn open(&self) -> Result<ChromeDriver> {
        info!("🚀 启动浏览器...");
        let config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动浏览器失败: {}", e);
            anyhow::anyhow!("启动浏览器失败: {}", e)
        })?;
        debug!("浏览器启动成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let page = browser
            .new_page("about:blank")
            .await
            .context("创建页面失败")?;

        Ok(ChromeDriver {
            browser,
            page,
            handler_task,
        })
    }
}

/// 基于 chromiumoxide 的浏览器会话，唯一持有 Browser 和 Page
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeDriver {
    async fn try_find(&self, selector: &Selector) -> Result<Element> {
        let element = match selector {
            Selector::XPath(xpath) => self.page.find_xpath(xpath.as_str()).await?,
            other => {
                let css = other.to_css().unwrap_or_default();
                self.page.find_element(css).await?
            }
        };
        Ok(element)
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        info!("已导航到: {}", url);
        Ok(())
    }

    async fn find_element(&self, selector: &Selector, wait: Duration) -> Result<Option<Element>> {
        let deadline = Instant::now() + wait;
        loop {
            match self.try_find(selector).await {
                Ok(element) => return Ok(Some(element)),
                Err(e) => {
                    if Instant::now() >= deadline {
                        debug!("元素未出现 ({}): {}", selector, e);
                        return Ok(None);
                    }
                }
            }
            sleep(FIND_POLL_INTERVAL).await;
        }
    }

    async fn click(&self, element: &Element) -> Result<()> {
        // click() 会先把元素滚动到可见区域
        element.click().await?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        element
            .call_js_fn(
                "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
                false,
            )
            .await?;
        element.click().await?;

        // 多行文本逐行输入，行间按回车
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                element.press_key("Enter").await?;
            }
            if !line.is_empty() {
                element.type_str(line.trim_end_matches('\r')).await?;
            }
        }
        Ok(())
    }

    async fn text(&self, element: &Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        // 优先读取 DOM 属性：href 这类属性会被解析为绝对地址
        if let Some(serde_json::Value::String(value)) = element.property(name).await? {
            return Ok(Some(value));
        }
        Ok(element.attribute(name).await?)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .with_context(|| format!("保存截图失败: {}", path.display()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    async fn close(&mut self) -> Result<()> {
        let closed = match self.browser.close().await {
            Ok(_) => self.browser.wait().await.map(|_| ()).context("等待浏览器进程退出失败"),
            Err(e) => Err(anyhow::Error::new(e).context("关闭浏览器失败")),
        };
        finish_close(closed, &self.handler_task)?;
        debug!("浏览器已关闭");
        Ok(())
    }
}

/// 无论关闭是否成功都停掉事件循环，再把关闭结果交给调用方
fn finish_close(closed: Result<()>, handler_task: &JoinHandle<()>) -> Result<()> {
    handler_task.abort();
    closed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_close_still_stops_event_loop() {
        let handler_task = tokio::spawn(std::future::pending::<()>());

        let result = finish_close(Err(anyhow::anyhow!("关闭浏览器失败")), &handler_task);

        assert!(result.is_err());
        let joined = handler_task.await;
        assert!(joined.is_err_and(|e| e.is_cancelled()));
    }
}
