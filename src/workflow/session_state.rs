//! 表单会话状态
//!
//! 状态严格线性推进，只有验证码子循环会在 OtpRequested 内部重复

use std::fmt;

use serde::Serialize;

use crate::error::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    Init,
    CookiesAccepted,
    LoggedIn,
    IdentityVerified,
    EmailSet,
    DeclarationTextSet,
    RecipientSet,
    IssuanceRequested,
    OtpRequested,
    OtpSubmitted,
    DocumentSaved,
    Failed(FailureKind),
}

impl SessionState {
    /// 下一个目标状态；终止状态返回 None
    pub fn next(self) -> Option<Self> {
        use SessionState::*;
        let next = match self {
            Init => CookiesAccepted,
            CookiesAccepted => LoggedIn,
            LoggedIn => IdentityVerified,
            IdentityVerified => EmailSet,
            EmailSet => DeclarationTextSet,
            DeclarationTextSet => RecipientSet,
            RecipientSet => IssuanceRequested,
            IssuanceRequested => OtpRequested,
            OtpRequested => OtpSubmitted,
            OtpSubmitted => DocumentSaved,
            DocumentSaved | Failed(_) => return None,
        };
        Some(next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::DocumentSaved | Self::Failed(_))
    }

    /// 用于文件名的简短名称
    pub fn slug(self) -> &'static str {
        use SessionState::*;
        match self {
            Init => "init",
            CookiesAccepted => "cookies_accepted",
            LoggedIn => "logged_in",
            IdentityVerified => "identity_verified",
            EmailSet => "email_set",
            DeclarationTextSet => "declaration_text_set",
            RecipientSet => "recipient_set",
            IssuanceRequested => "issuance_requested",
            OtpRequested => "otp_requested",
            OtpSubmitted => "otp_submitted",
            DocumentSaved => "document_saved",
            Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(kind) => write!(f, "failed({kind})"),
            other => f.write_str(other.slug()),
        }
    }
}
