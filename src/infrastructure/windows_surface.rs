//! Windows 通知中心（xcap 截图 + UI Automation）
//!
//! 依赖系统语言：通知中心窗口名与"全部清除"按钮的文字都来自配置

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::RgbaImage;
use tracing::debug;
use uiautomation::inputs::Mouse;
use uiautomation::types::Point;
use uiautomation::{UIAutomation, UIElement};

use crate::infrastructure::notification::{CaptureRegion, DisplayBounds, NotificationSurface};

/// 不持有任何 COM 对象，每次调用时重新创建，保证可以跨 await 移动
#[derive(Debug, Default)]
pub struct WindowsNotificationCenter;

impl WindowsNotificationCenter {
    pub fn new() -> Self {
        Self
    }

    fn primary_monitor() -> Result<xcap::Monitor> {
        let monitors = xcap::Monitor::all().map_err(|e| anyhow!("无法枚举显示器: {e}"))?;
        for monitor in monitors {
            if monitor
                .is_primary()
                .map_err(|e| anyhow!("无法读取主显示器标记: {e}"))?
            {
                return Ok(monitor);
            }
        }
        Err(anyhow!("未找到主显示器"))
    }

    fn bounds_of(monitor: &xcap::Monitor) -> Result<DisplayBounds> {
        Ok(DisplayBounds {
            x: monitor.x().map_err(|e| anyhow!("{e}"))?,
            y: monitor.y().map_err(|e| anyhow!("{e}"))?,
            width: monitor.width().map_err(|e| anyhow!("{e}"))?,
            height: monitor.height().map_err(|e| anyhow!("{e}"))?,
        })
    }

    fn click_control_blocking(window_name: &str, control_name: &str, max_depth: u32) -> Result<bool> {
        let automation = UIAutomation::new().map_err(|e| anyhow!("UI Automation 初始化失败: {e}"))?;
        let root = automation
            .get_root_element()
            .map_err(|e| anyhow!("无法获取桌面根元素: {e}"))?;

        let window_needle = window_name.to_string();
        let windows: Vec<UIElement> = automation
            .create_matcher()
            .from_ref(&root)
            .depth(1)
            .timeout(0)
            .filter_fn(Box::new(move |e: &UIElement| {
                Ok(e.get_name().unwrap_or_default().contains(&window_needle))
            }))
            .find_all()
            .unwrap_or_default();

        let mut clicked = false;
        for window in windows {
            debug!("找到通知中心窗口: {}", window.get_name().unwrap_or_default());
            let label = control_name.to_string();
            let button = automation
                .create_matcher()
                .from_ref(&window)
                .depth(max_depth)
                .timeout(0)
                .filter_fn(Box::new(move |e: &UIElement| {
                    Ok(e.get_name().unwrap_or_default() == label)
                }))
                .find_first();

            if let Ok(button) = button {
                button.click().map_err(|e| anyhow!("点击 '{control_name}' 失败: {e}"))?;
                clicked = true;
            }
        }
        Ok(clicked)
    }
}

#[async_trait]
impl NotificationSurface for WindowsNotificationCenter {
    fn primary_display(&self) -> Result<DisplayBounds> {
        Self::bounds_of(&Self::primary_monitor()?)
    }

    async fn click_at(&mut self, x: i32, y: i32) -> Result<()> {
        Mouse::default()
            .click(Point::new(x, y))
            .map_err(|e| anyhow!("点击屏幕位置 ({x}, {y}) 失败: {e}"))
    }

    async fn capture_region(&mut self, region: CaptureRegion) -> Result<RgbaImage> {
        let monitor = Self::primary_monitor()?;
        let bounds = Self::bounds_of(&monitor)?;
        let full = monitor
            .capture_image()
            .map_err(|e| anyhow!("截图失败: {e}"))?;

        // 区域坐标换算为显示器内坐标
        let left = (region.x - bounds.x).max(0) as u32;
        let top = (region.y - bounds.y).max(0) as u32;
        let width = region.width.min(full.width().saturating_sub(left));
        let height = region.height.min(full.height().saturating_sub(top));

        Ok(image::imageops::crop_imm(&full, left, top, width, height).to_image())
    }

    async fn click_control(
        &mut self,
        window_name: &str,
        control_name: &str,
        max_depth: u32,
    ) -> Result<bool> {
        Self::click_control_blocking(window_name, control_name, max_depth)
    }
}
