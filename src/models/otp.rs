use std::fmt;

use chrono::{DateTime, Local};
use image::RgbaImage;

/// 短信验证码（定长数字串）
///
/// 由 OtpChannel 产生，只被提交一次，不做持久化
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OtpCode({})", self.0)
    }
}

/// 一次轮询捕获的通知区域截图
#[derive(Debug, Clone)]
pub struct NotificationSnapshot {
    pub image: RgbaImage,
    /// 已把换行规整为空格的 OCR 文本
    pub text: String,
    pub captured_at: DateTime<Local>,
}
