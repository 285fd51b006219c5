use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::SessionState;

/// 底层错误的统一装箱类型（保留为 `source()`）
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 单条声明失败的分类
///
/// 写入结果台账，便于事后统计哪一类失败最多
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 必需的页面元素未在超时内出现
    ElementNotFound,
    /// 服务器返回的税号与调用方提供的不一致
    IdentityMismatch,
    /// 验证码通道超时，没有收到任何候选验证码
    OtpNotReceived,
    /// 提交的验证码全部被拒绝，重试次数耗尽
    OtpRejectedTooManyTimes,
    /// 文档下载失败
    DownloadFailed,
    /// 浏览器会话无法启动
    SessionUnavailable,
    /// 浏览器命令执行失败
    Browser,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ElementNotFound => "element_not_found",
            Self::IdentityMismatch => "identity_mismatch",
            Self::OtpNotReceived => "otp_not_received",
            Self::OtpRejectedTooManyTimes => "otp_rejected_too_many_times",
            Self::DownloadFailed => "download_failed",
            Self::SessionUnavailable => "session_unavailable",
            Self::Browser => "browser",
        };
        f.write_str(name)
    }
}

/// 单次声明流程中的分类错误
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("[{step}] 页面元素未找到: {selector}")]
    ElementNotFound { step: SessionState, selector: String },

    #[error("税号不一致: 服务器返回 {actual}，期望 {expected}")]
    IdentityMismatch { expected: String, actual: String },

    #[error("{timeout_secs} 秒内未收到短信验证码")]
    OtpNotReceived { timeout_secs: u64 },

    #[error("验证码被拒绝 {attempts} 次，放弃提交")]
    OtpRejectedTooManyTimes { attempts: u32 },

    #[error("文档下载失败 ({url}): {reason}")]
    DownloadFailed {
        url: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("无法启动浏览器会话: {source}")]
    SessionUnavailable {
        #[source]
        source: BoxError,
    },

    #[error("[{step}] 浏览器操作失败: {source}")]
    Browser {
        step: SessionState,
        #[source]
        source: BoxError,
    },
}

impl DeclarationError {
    /// 返回错误分类
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ElementNotFound { .. } => FailureKind::ElementNotFound,
            Self::IdentityMismatch { .. } => FailureKind::IdentityMismatch,
            Self::OtpNotReceived { .. } => FailureKind::OtpNotReceived,
            Self::OtpRejectedTooManyTimes { .. } => FailureKind::OtpRejectedTooManyTimes,
            Self::DownloadFailed { .. } => FailureKind::DownloadFailed,
            Self::SessionUnavailable { .. } => FailureKind::SessionUnavailable,
            Self::Browser { .. } => FailureKind::Browser,
        }
    }

    pub fn element_not_found(step: SessionState, selector: impl fmt::Display) -> Self {
        Self::ElementNotFound {
            step,
            selector: selector.to_string(),
        }
    }

    /// 包装浏览器驱动返回的底层错误
    pub fn browser(step: SessionState, source: anyhow::Error) -> Self {
        Self::Browser {
            step,
            source: source.into(),
        }
    }

    pub fn download_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub fn download_failed_with(
        url: impl Into<String>,
        reason: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            reason: reason.into(),
            source: Some(source.into()),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },

    #[error("验证码正则无效 '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("选择器文件解析失败 ({path}): {source}")]
    SelectorsParseFailed {
        path: String,
        #[source]
        source: BoxError,
    },
}

/// 应用级（致命）错误，出现时整个批次不会启动
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("批量输入文件不存在: {}", .path.display())]
    InputFileMissing { path: PathBuf },

    #[error("批量输入文件解析失败 ({}): {source}", .path.display())]
    BatchParseFailed {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("当前平台不支持通知中心自动化: {platform}")]
    UnsupportedPlatform { platform: &'static str },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
