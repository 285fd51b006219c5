//! 门户页面选择器
//!
//! 选择器是数据而不是逻辑：门户改版或切换语言时，只需提供一个 TOML 文件覆盖对应字段

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 页面元素选择器
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    /// 元素 id（允许包含 `:` 等 CSS 特殊字符）
    Id(String),
    /// `name` 属性
    Name(String),
    Css(String),
    /// XPath，用于按文本或属性包含匹配
    XPath(String),
}

impl Selector {
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    /// 转换为 CSS 选择器；XPath 返回 None
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Id(id) => Some(format!("[id=\"{}\"]", escape_css_string(id))),
            Self::Name(name) => Some(format!("[name=\"{}\"]", escape_css_string(name))),
            Self::Css(css) => Some(css.clone()),
            Self::XPath(_) => None,
        }
    }
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={}", v),
            Self::Name(v) => write!(f, "name={}", v),
            Self::Css(v) => write!(f, "css={}", v),
            Self::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

/// 声明流程用到的全部选择器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSelectors {
    pub cookie_accept: Selector,
    pub login_button: Selector,
    pub auth_provider: Selector,
    pub username_input: Selector,
    pub password_input: Selector,
    pub login_submit: Selector,
    pub consent_continue: Selector,
    pub consent_send: Selector,
    /// 登录后页面上显示税号的元素
    pub tax_id_value: Selector,
    pub continue_button: Selector,
    pub email_input: Selector,
    pub declaration_text: Selector,
    pub recipient_input: Selector,
    pub issue_button: Selector,
    pub sms_option: Selector,
    pub code_input: Selector,
    pub confirm_button: Selector,
    /// 验证码错误提示
    pub wrong_code_indicator: Selector,
    pub download_link: Selector,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            cookie_accept: Selector::xpath("//button[contains(text(), 'Ενημερώθηκα')]"),
            login_button: Selector::xpath("//button[contains(text(), 'Σύνδεση')]"),
            auth_provider: Selector::xpath("//button[contains(text(), 'ΓΓΠΣΨΔ')]"),
            username_input: Selector::id("j_username"),
            password_input: Selector::id("j_password"),
            login_submit: Selector::id("btn-login-submit"),
            consent_continue: Selector::xpath("//span[contains(text(), 'Συνέχεια')]"),
            consent_send: Selector::xpath("//button[text()='Αποστολή']"),
            tax_id_value: Selector::xpath(
                "//div[@data-testid='user'][.//dt[span[text()='Α.Φ.Μ.']]]//dd",
            ),
            continue_button: Selector::xpath("//button[text()='Συνέχεια']"),
            email_input: Selector::id("solemn:email"),
            declaration_text: Selector::xpath("//textarea[@name='free_text']"),
            recipient_input: Selector::id("solemn:recipient"),
            issue_button: Selector::xpath("//button[contains(text(), 'Έκδοση')]"),
            sms_option: Selector::xpath(
                "//label[contains(., 'Με αποστολή SMS')]/input[@type='radio']",
            ),
            code_input: Selector::id("confirmation_code"),
            confirm_button: Selector::xpath("//button[text()='Επιβεβαίωση']"),
            wrong_code_indicator: Selector::xpath(
                "//*[contains(text(), 'Λανθασμένος κωδικός επιβεβαίωσης')]",
            ),
            download_link: Selector::xpath("//a[contains(@href, \"pdf-download\")]"),
        }
    }
}

impl PortalSelectors {
    /// 解析 TOML 文本，未出现的字段保留默认值
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 从文件加载选择器覆盖
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ConfigError::SelectorsParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            }
        })?;

        Self::from_toml_str(&content).map_err(|e| ConfigError::SelectorsParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_with_colon_becomes_attribute_selector() {
        let selector = Selector::id("solemn:email");
        assert_eq!(selector.to_css().unwrap(), "[id=\"solemn:email\"]");
        assert!(Selector::xpath("//a").to_css().is_none());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let toml = r#"
            continue_button = { xpath = "//button[text()='Continue']" }
            code_input = { name = "otp" }
        "#;
        let selectors = PortalSelectors::from_toml_str(toml).unwrap();
        let defaults = PortalSelectors::default();

        assert_eq!(
            selectors.continue_button,
            Selector::xpath("//button[text()='Continue']")
        );
        assert_eq!(selectors.code_input, Selector::Name("otp".into()));
        assert_eq!(selectors.login_button, defaults.login_button);
    }

    #[test]
    fn test_display_names_kind() {
        assert_eq!(Selector::id("j_username").to_string(), "id=j_username");
    }
}
