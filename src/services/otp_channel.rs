//! 短信验证码通道 - 业务能力层
//!
//! 轮询桌面通知中心，OCR 识别后用正则提取验证码，并负责清空已处理的通知。
//! 整个进程只有一个实例，由编排层按顺序借给各个 FormSession 使用

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use regex::Regex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ConfigError;
use crate::infrastructure::{CaptureRegion, DisplayBounds, NotificationSurface, OcrEngine};
use crate::models::{NotificationSnapshot, OtpCode};

/// 通知卡片所在的右侧竖条宽度（像素）
pub const MESSAGE_PIXEL_WIDTH: u32 = 300;
/// 通知图标相对主显示器右下角的偏移（像素）
pub const ICON_OFFSET_X: i32 = -20;
pub const ICON_OFFSET_Y: i32 = -20;
/// 查找"全部清除"按钮的最大深度
pub const CLEAR_SEARCH_DEPTH: u32 = 10;

/// 获取验证码的能力
///
/// FormSession 只依赖这个 trait，便于在测试中注入固定的验证码序列
#[async_trait]
pub trait OtpSource: Send {
    /// 在 `timeout` 内等待下一条验证码；超时返回 None，这是正常结果而不是错误
    async fn acquire_code(&mut self, timeout: Duration) -> Option<OtpCode>;

    /// 清空通知中心，返回是否真的点击了清除按钮
    async fn clear_all(&mut self) -> bool;
}

/// 验证码通道配置
#[derive(Debug, Clone)]
pub struct OtpSettings {
    pub pattern: Regex,
    pub languages: String,
    /// 通知中心窗口名包含的子串
    pub window_name: String,
    pub clear_button_label: String,
    pub poll_interval: Duration,
    /// 点击通知图标后等待面板展开的时间
    pub settle_delay: Duration,
    /// 启用时每次轮询都保存截图与识别文本
    pub evidence_dir: Option<PathBuf>,
}

impl OtpSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: config.compiled_otp_pattern()?,
            languages: config.ocr_languages.clone(),
            window_name: config.notification_center_name.clone(),
            clear_button_label: config.clear_button_label.clone(),
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            evidence_dir: config.debug_evidence.then(|| config.debug_dir.clone()),
        })
    }
}

/// 根据主显示器计算截图区域和通知图标位置
pub fn notification_geometry(display: DisplayBounds) -> (CaptureRegion, (i32, i32)) {
    let width = MESSAGE_PIXEL_WIDTH.min(display.width);
    let right = display.x + display.width as i32;
    let bottom = display.y + display.height as i32;

    let region = CaptureRegion {
        x: right - width as i32,
        y: display.y,
        width,
        height: display.height,
    };
    (region, (right + ICON_OFFSET_X, bottom + ICON_OFFSET_Y))
}

/// 把 OCR 文本中的换行统一替换为空格，便于跨行匹配
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// 从文本中提取唯一的验证码
///
/// - 取每个匹配中第一个参与匹配的捕获组
/// - 紧挨着其他数字的捕获视为位数不对的近似匹配，忽略
/// - 出现两个以上不同的验证码视为有歧义，返回 None
pub fn extract_code(pattern: &Regex, text: &str) -> Option<OtpCode> {
    let mut found: Option<&str> = None;

    for caps in pattern.captures_iter(text) {
        let Some(group) = caps.iter().skip(1).flatten().next() else {
            continue;
        };
        if touches_digit(text, group.start(), group.end()) {
            debug!("忽略近似匹配: {}", group.as_str());
            continue;
        }
        if let Some(previous) = found {
            warn!(
                "通知中出现多个验证码 ({} / {})，本次不采用",
                previous,
                group.as_str()
            );
            return None;
        }
        found = Some(group.as_str());
    }

    found.map(OtpCode::new)
}

fn touches_digit(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(|c| c.is_ascii_digit()) || after.is_some_and(|c| c.is_ascii_digit())
}

/// 基于桌面通知中心的验证码通道
pub struct OtpChannel<S, O> {
    surface: S,
    ocr: O,
    settings: OtpSettings,
    region: CaptureRegion,
    icon_position: (i32, i32),
    polls: u64,
}

impl<S: NotificationSurface, O: OcrEngine> OtpChannel<S, O> {
    /// 创建通道，截图区域只在这里根据主显示器计算一次
    pub fn new(surface: S, ocr: O, settings: OtpSettings) -> Result<Self> {
        let display = surface.primary_display().context("无法获取主显示器尺寸")?;
        let (region, icon_position) = notification_geometry(display);
        debug!(
            "通知区域: {:?}, 图标位置: {:?}",
            region, icon_position
        );

        Ok(Self {
            surface,
            ocr,
            settings,
            region,
            icon_position,
            polls: 0,
        })
    }

    /// 创建通道并先清空一次通知，避免一开始就看到旧验证码
    pub async fn open(surface: S, ocr: O, settings: OtpSettings) -> Result<Self> {
        let mut channel = Self::new(surface, ocr, settings)?;
        if channel.clear_all().await {
            info!("🧹 已清空历史通知");
        }
        Ok(channel)
    }

    pub fn capture_region(&self) -> CaptureRegion {
        self.region
    }

    async fn open_tray(&mut self) -> Result<()> {
        let (x, y) = self.icon_position;
        self.surface.click_at(x, y).await?;
        sleep(self.settings.settle_delay).await;
        Ok(())
    }

    async fn take_snapshot(&mut self) -> Result<NotificationSnapshot> {
        self.open_tray().await?;
        let image = self.surface.capture_region(self.region).await?;
        let raw = self
            .ocr
            .recognize_text(&image, &self.settings.languages)
            .await?;

        Ok(NotificationSnapshot {
            image,
            text: normalize_line_breaks(&raw),
            captured_at: Local::now(),
        })
    }

    async fn poll_once(&mut self) -> Result<Option<OtpCode>> {
        self.polls += 1;
        let snapshot = self.take_snapshot().await?;
        if let Some(dir) = &self.settings.evidence_dir {
            save_evidence(dir, self.polls, &snapshot).await;
        }
        Ok(extract_code(&self.settings.pattern, &snapshot.text))
    }
}

/// 保存一次轮询的截图和识别文本，失败只记录警告
async fn save_evidence(dir: &Path, poll: u64, snapshot: &NotificationSnapshot) {
    let stem = format!(
        "otp_poll_{}_{}",
        snapshot.captured_at.format("%Y%m%dT%H%M%S"),
        poll
    );

    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        snapshot.image.save(dir.join(format!("{stem}.png")))?;
        tokio::fs::write(dir.join(format!("{stem}.txt")), &snapshot.text).await?;
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if let Err(e) = result {
        warn!("保存轮询截图失败: {:#}", e);
    }
}

#[async_trait]
impl<S: NotificationSurface, O: OcrEngine> OtpSource for OtpChannel<S, O> {
    async fn acquire_code(&mut self, timeout: Duration) -> Option<OtpCode> {
        let deadline = Instant::now() + timeout;
        info!("📨 等待短信验证码 (最长 {} 秒)...", timeout.as_secs());

        loop {
            match self.poll_once().await {
                Ok(Some(code)) => {
                    info!("✓ 识别到验证码: {}", code);
                    self.clear_all().await;
                    return Some(code);
                }
                Ok(None) => debug!("第 {} 次轮询未发现验证码", self.polls),
                Err(e) => warn!("第 {} 次轮询失败: {:#}", self.polls, e),
            }

            if Instant::now() >= deadline {
                break;
            }
            sleep(self.settings.poll_interval).await;
        }

        warn!("⚠️ {} 秒内未收到验证码", timeout.as_secs());
        None
    }

    async fn clear_all(&mut self) -> bool {
        if let Err(e) = self.open_tray().await {
            warn!("打开通知中心失败: {:#}", e);
            return false;
        }

        match self
            .surface
            .click_control(
                &self.settings.window_name,
                &self.settings.clear_button_label,
                CLEAR_SEARCH_DEPTH,
            )
            .await
        {
            Ok(clicked) => {
                debug!("清空通知: {}", if clicked { "已点击" } else { "无可清除" });
                clicked
            }
            Err(e) => {
                warn!("清空通知失败: {:#}", e);
                false
            }
        }
    }
}
