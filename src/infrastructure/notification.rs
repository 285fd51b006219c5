//! 桌面通知中心能力 - 基础设施层

use anyhow::Result;
use async_trait::async_trait;
use image::RgbaImage;

/// 显示器在虚拟桌面中的位置与尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// 屏幕截图区域（虚拟桌面坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// 操作系统的通知中心
///
/// 同一时间只能有一个使用者：它占用一块屏幕区域，并且通知中心的
/// "当前通知" 状态会被并发轮询打乱
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    /// 主显示器的边界
    fn primary_display(&self) -> Result<DisplayBounds>;

    async fn click_at(&mut self, x: i32, y: i32) -> Result<()>;

    async fn capture_region(&mut self, region: CaptureRegion) -> Result<RgbaImage>;

    /// 在名称包含 `window_name` 的顶层窗口中，按 `max_depth` 深度查找名为
    /// `control_name` 的控件并点击，返回是否发生了点击
    async fn click_control(
        &mut self,
        window_name: &str,
        control_name: &str,
        max_depth: u32,
    ) -> Result<bool>;
}
