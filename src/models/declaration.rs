use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{DeclarationError, FailureKind};

/// 门户登录凭据
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// 税号（Α.Φ.Μ.），用于核对登录后的账户
    pub tax_id: String,
    pub email: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("tax_id", &self.tax_id)
            .field("email", &self.email)
            .finish()
    }
}

/// 一条待提交的声明
///
/// 创建后不再修改，整个生命周期只被一个 FormSession 借用
#[derive(Debug, Clone)]
pub struct DeclarationRequest {
    /// 输入文件中的行号（从 1 开始）
    pub row: usize,
    /// 行内第几个接收方（从 1 开始）
    pub column: usize,
    pub receiver: String,
    pub text: String,
    pub credentials: Credentials,
    /// PDF 的目标目录
    pub destination_dir: PathBuf,
    /// 目标文件名，未指定时使用 `declaration.pdf`
    pub filename: Option<String>,
}

impl DeclarationRequest {
    pub const DEFAULT_FILENAME: &'static str = "declaration.pdf";

    pub fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or(Self::DEFAULT_FILENAME)
    }

    /// 日志用的上下文前缀
    pub fn ctx(&self) -> DeclarationCtx {
        DeclarationCtx {
            row: self.row,
            column: self.column,
            receiver: self.receiver.clone(),
        }
    }
}

/// 声明处理上下文
///
/// 封装"我正在处理哪一行的哪个接收方"这一信息，只用于日志
#[derive(Debug, Clone)]
pub struct DeclarationCtx {
    pub row: usize,
    pub column: usize,
    pub receiver: String,
}

impl fmt::Display for DeclarationCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[声明 {}/{} 接收方#{}]",
            self.row, self.column, self.receiver
        )
    }
}

/// 成功保存的文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    pub file_url: String,
    pub file_path: PathBuf,
}

/// 单条声明的处理结果，追加到批次台账后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationResult {
    pub row: usize,
    pub column: usize,
    pub receiver: String,
    pub file_url: Option<String>,
    pub file_path: Option<PathBuf>,
    pub failure_kind: Option<FailureKind>,
    pub failure_reason: Option<String>,
    pub finished_at: DateTime<Local>,
}

impl DeclarationResult {
    pub fn succeeded(request: &DeclarationRequest, document: SavedDocument) -> Self {
        Self {
            row: request.row,
            column: request.column,
            receiver: request.receiver.clone(),
            file_url: Some(document.file_url),
            file_path: Some(document.file_path),
            failure_kind: None,
            failure_reason: None,
            finished_at: Local::now(),
        }
    }

    pub fn failed(request: &DeclarationRequest, error: &DeclarationError) -> Self {
        Self {
            row: request.row,
            column: request.column,
            receiver: request.receiver.clone(),
            file_url: None,
            file_path: None,
            failure_kind: Some(error.kind()),
            failure_reason: Some(error.to_string()),
            finished_at: Local::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_kind.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DeclarationRequest {
        DeclarationRequest {
            row: 2,
            column: 1,
            receiver: "ΔΟΥ Αθηνών".into(),
            text: "κείμενο".into(),
            credentials: Credentials {
                username: "user".into(),
                password: "secret".into(),
                tax_id: "999888777".into(),
                email: "user@example.com".into(),
            },
            destination_dir: PathBuf::from("downloads"),
            filename: None,
        }
    }

    #[test]
    fn test_password_is_masked_in_debug() {
        let printed = format!("{:?}", request().credentials);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_failed_result_has_no_file_fields() {
        let err = DeclarationError::OtpNotReceived { timeout_secs: 60 };
        let result = DeclarationResult::failed(&request(), &err);
        assert!(!result.is_success());
        assert_eq!(result.failure_kind, Some(FailureKind::OtpNotReceived));
        assert!(result.file_url.is_none());
        assert!(result.file_path.is_none());
    }

    #[test]
    fn test_default_filename() {
        assert_eq!(request().filename(), "declaration.pdf");
    }
}
