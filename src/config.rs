use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;
use crate::models::Credentials;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 门户账号（用户名 / 密码 / 税号 / 邮箱）
    pub credentials: Credentials,
    /// 声明表单入口 URL
    pub portal_url: String,
    /// 批量输入文件（TOML）
    pub batch_file: PathBuf,
    /// PDF 保存根目录
    pub download_dir: PathBuf,
    /// 批次报告输出目录
    pub report_dir: PathBuf,
    /// 保存的文件名（重名时自动追加 " (n)"）
    pub declaration_filename: String,
    /// 门户选择器覆盖文件（可选）
    pub selectors_file: Option<PathBuf>,

    // --- 网页步骤 ---
    /// 单个网页步骤等待元素的超时
    pub web_timeout: Duration,
    /// 提交验证码后等待"验证码错误"提示的时间
    pub confirmation_wait: Duration,
    /// 导航 / 下载等瞬时失败的重试次数
    pub step_retries: u32,

    // --- 短信验证码 ---
    pub otp_timeout: Duration,
    /// 验证码提交的总尝试次数
    pub otp_retries: u32,
    pub otp_pattern: String,
    pub tesseract_cmd: PathBuf,
    pub ocr_languages: String,
    pub notification_center_name: String,
    pub clear_button_label: String,

    // --- 调试 ---
    /// 每次轮询都保存截图与 OCR 文本
    pub debug_evidence: bool,
    /// 步骤失败时保存浏览器截图
    pub failure_screenshots: bool,
    pub debug_dir: PathBuf,

    // --- 浏览器 ---
    pub browser_executable: Option<PathBuf>,
    pub browser_headless: bool,

    // --- 日志 ---
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    pub const DEFAULT_PORTAL_URL: &'static str =
        "https://dilosi.services.gov.gr/templates/YPDIL/create";
    pub const DEFAULT_OTP_PATTERN: &'static str = r"(\d{6})\s+ΚΩΔΙΚΟΣ ΓΙΑ ΕΚΔΟΣΗ";

    /// 使用给定账号和默认值构建配置
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            portal_url: Self::DEFAULT_PORTAL_URL.to_string(),
            batch_file: PathBuf::from("declarations.toml"),
            download_dir: PathBuf::from("downloads"),
            report_dir: PathBuf::from("."),
            declaration_filename: "declaration.pdf".to_string(),
            selectors_file: None,
            web_timeout: Duration::from_secs(15),
            confirmation_wait: Duration::from_millis(1000),
            step_retries: 2,
            otp_timeout: Duration::from_secs(60),
            otp_retries: 3,
            otp_pattern: Self::DEFAULT_OTP_PATTERN.to_string(),
            tesseract_cmd: PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe"),
            ocr_languages: "ell+deu+eng".to_string(),
            notification_center_name: "Benachrichtigungscenter".to_string(),
            clear_button_label: "Alle löschen".to_string(),
            debug_evidence: false,
            failure_screenshots: true,
            debug_dir: PathBuf::from("debug"),
            browser_executable: None,
            browser_headless: false,
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
        }
    }

    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = Credentials {
            username: required("DECLARATION_USERNAME")?,
            password: required("DECLARATION_PASSWORD")?,
            tax_id: required("DECLARATION_TAX_ID")?,
            email: required("DECLARATION_EMAIL")?,
        };
        let d = Self::with_credentials(credentials);

        let config = Self {
            portal_url: string_or("PORTAL_URL", d.portal_url),
            batch_file: path_or("BATCH_FILE", d.batch_file),
            download_dir: path_or("DOWNLOAD_DIR", d.download_dir),
            report_dir: path_or("REPORT_DIR", d.report_dir),
            declaration_filename: string_or("DECLARATION_FILENAME", d.declaration_filename),
            selectors_file: std::env::var("SELECTORS_FILE").ok().map(PathBuf::from),
            web_timeout: Duration::from_secs(parsed_or("WEB_TIMEOUT_SECS", 15u64)?),
            confirmation_wait: Duration::from_millis(parsed_or("CONFIRMATION_WAIT_MS", 1000u64)?),
            step_retries: parsed_or("STEP_RETRIES", d.step_retries)?,
            otp_timeout: Duration::from_secs(parsed_or("OTP_TIMEOUT_SECS", 60u64)?),
            otp_retries: parsed_or("OTP_RETRIES", d.otp_retries)?,
            otp_pattern: string_or("OTP_PATTERN", d.otp_pattern),
            tesseract_cmd: path_or("TESSERACT_CMD", d.tesseract_cmd),
            ocr_languages: string_or("OCR_LANGUAGES", d.ocr_languages),
            notification_center_name: string_or(
                "NOTIFICATION_CENTER_NAME",
                d.notification_center_name,
            ),
            clear_button_label: string_or("CLEAR_BUTTON_LABEL", d.clear_button_label),
            debug_evidence: parsed_or("DEBUG_EVIDENCE", d.debug_evidence)?,
            failure_screenshots: parsed_or("FAILURE_SCREENSHOTS", d.failure_screenshots)?,
            debug_dir: path_or("DEBUG_DIR", d.debug_dir),
            browser_executable: std::env::var("BROWSER_EXECUTABLE").ok().map(PathBuf::from),
            browser_headless: parsed_or("BROWSER_HEADLESS", d.browser_headless)?,
            log_dir: path_or("LOG_DIR", d.log_dir),
            log_level: string_or("LOG_LEVEL", d.log_level),
            credentials: d.credentials,
        };

        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围，并确认验证码正则可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compiled_otp_pattern()?;

        if self.otp_retries == 0 {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "OTP_RETRIES".to_string(),
                value: "0".to_string(),
                expected_type: "正整数".to_string(),
            });
        }

        Ok(())
    }

    /// 编译验证码正则，要求至少包含一个捕获组
    pub fn compiled_otp_pattern(&self) -> Result<Regex, ConfigError> {
        let regex = Regex::new(&self.otp_pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: self.otp_pattern.clone(),
            reason: e.to_string(),
        })?;

        if regex.captures_len() < 2 {
            return Err(ConfigError::InvalidPattern {
                pattern: self.otp_pattern.clone(),
                reason: "至少需要一个捕获组".to_string(),
            });
        }

        Ok(regex)
    }
}

fn required(var_name: &str) -> Result<String, ConfigError> {
    std::env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound {
        var_name: var_name.to_string(),
    })
}

fn string_or(var_name: &str, default: String) -> String {
    std::env::var(var_name).unwrap_or(default)
}

fn path_or(var_name: &str, default: PathBuf) -> PathBuf {
    std::env::var(var_name).map(PathBuf::from).unwrap_or(default)
}

fn parsed_or<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => parse_value(var_name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var_name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: std::any::type_name::<T>().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::with_credentials(Credentials {
            username: "user".into(),
            password: "secret".into(),
            tax_id: "999888777".into(),
            email: "user@example.com".into(),
        })
    }

    #[test]
    fn test_default_pattern_compiles() {
        let config = test_config();
        let regex = config.compiled_otp_pattern().unwrap();
        let caps = regex.captures("961324 ΚΩΔΙΚΟΣ ΓΙΑ ΕΚΔΟΣΗ").unwrap();
        assert_eq!(&caps[1], "961324");
    }

    #[test]
    fn test_pattern_without_group_is_rejected() {
        let mut config = test_config();
        config.otp_pattern = r"\d{6}".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_zero_retries_is_rejected() {
        let mut config = test_config();
        config.otp_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_value_reports_type() {
        let err = parse_value::<u64>("OTP_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("OTP_TIMEOUT_SECS"));
        assert_eq!(parse_value::<bool>("DEBUG_EVIDENCE", " true ").unwrap(), true);
    }
}
