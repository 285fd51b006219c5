//! 集成测试共用的假实现：脚本化门户、下载器、验证码来源
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use declaration_submit::browser::{BrowserDriver, DriverFactory};
use declaration_submit::infrastructure::ArtifactFetcher;
use declaration_submit::models::{Credentials, DeclarationRequest, OtpCode, PortalSelectors, Selector};
use declaration_submit::services::OtpSource;
use declaration_submit::workflow::{RetryPolicy, SessionSettings};

pub const CALLER_TAX_ID: &str = "999888777";
pub const PDF_BYTES: &[u8] = b"%PDF-1.4 fake declaration";

pub fn credentials() -> Credentials {
    Credentials {
        username: "user".into(),
        password: "secret".into(),
        tax_id: CALLER_TAX_ID.into(),
        email: "user@example.com".into(),
    }
}

pub fn request(destination_dir: &Path) -> DeclarationRequest {
    DeclarationRequest {
        row: 1,
        column: 1,
        receiver: "ΔΟΥ Α' Αθηνών".into(),
        text: "Δηλώνω ότι...".into(),
        credentials: credentials(),
        destination_dir: destination_dir.to_path_buf(),
        filename: None,
    }
}

pub fn settings(otp_retries: u32) -> SessionSettings {
    SessionSettings {
        portal_url: "https://portal.example/create".into(),
        web_timeout: Duration::from_secs(1),
        confirmation_wait: Duration::from_millis(100),
        otp_timeout: Duration::from_secs(60),
        otp_retries,
        step_retry: RetryPolicy::new(1, Duration::ZERO),
        failure_screenshot_dir: None,
    }
}

/// 一个会话的门户行为
#[derive(Clone)]
pub struct PortalScript {
    /// 登录后页面显示的税号
    pub tax_id: String,
    pub cookie_banner: bool,
    /// 判断验证码是否被接受
    pub accept: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    /// 永远找不到的元素
    pub missing: Option<Selector>,
    /// 下载链接的 href，None 表示链接没有该属性
    pub href: Option<&'static str>,
}

impl PortalScript {
    pub fn accepting_all() -> Self {
        Self {
            tax_id: CALLER_TAX_ID.into(),
            cookie_banner: true,
            accept: Arc::new(|_: &str| true),
            missing: None,
            href: Some("/pdf-download/abc123"),
        }
    }

    pub fn accepting_only(code: &'static str) -> Self {
        Self {
            accept: Arc::new(move |c: &str| c == code),
            ..Self::accepting_all()
        }
    }

    pub fn with_tax_id(mut self, tax_id: &str) -> Self {
        self.tax_id = tax_id.into();
        self
    }
}

pub type PortalLogHandle = Arc<Mutex<PortalLog>>;

/// 门户记录下来的操作
#[derive(Debug, Default)]
pub struct PortalLog {
    pub actions: Vec<String>,
    pub submitted_codes: Vec<String>,
    pub navigations: usize,
    pub screenshots: Vec<PathBuf>,
    pub closed: bool,
    typed_code: Option<String>,
    last_code_rejected: bool,
}

impl PortalLog {
    pub fn typed_into(&self, selector: &Selector) -> bool {
        let prefix = format!("type:{selector}=");
        self.actions.iter().any(|a| a.starts_with(&prefix))
    }
}

/// 按照脚本响应的假门户
pub struct FakePortal {
    selectors: PortalSelectors,
    script: PortalScript,
    log: Arc<Mutex<PortalLog>>,
}

impl FakePortal {
    pub fn new(script: PortalScript) -> (Self, PortalLogHandle) {
        let log = Arc::new(Mutex::new(PortalLog::default()));
        let portal = Self {
            selectors: PortalSelectors::default(),
            script,
            log: log.clone(),
        };
        (portal, log)
    }
}

#[async_trait]
impl BrowserDriver for FakePortal {
    type Element = Selector;

    async fn navigate(&self, _url: &str) -> Result<()> {
        self.log.lock().unwrap().navigations += 1;
        Ok(())
    }

    async fn find_element(&self, selector: &Selector, _wait: Duration) -> Result<Option<Selector>> {
        if self.script.missing.as_ref() == Some(selector) {
            return Ok(None);
        }
        if *selector == self.selectors.cookie_accept && !self.script.cookie_banner {
            return Ok(None);
        }
        if *selector == self.selectors.wrong_code_indicator {
            let rejected = self.log.lock().unwrap().last_code_rejected;
            return Ok(rejected.then(|| selector.clone()));
        }
        Ok(Some(selector.clone()))
    }

    async fn click(&self, element: &Selector) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.actions.push(format!("click:{element}"));

        if *element == self.selectors.confirm_button {
            let Some(code) = log.typed_code.take() else {
                bail!("验证码输入框为空");
            };
            log.last_code_rejected = !(self.script.accept)(&code);
            log.submitted_codes.push(code);
        }
        Ok(())
    }

    async fn type_text(&self, element: &Selector, text: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.actions.push(format!("type:{element}={text}"));
        if *element == self.selectors.code_input {
            log.typed_code = Some(text.to_string());
        }
        Ok(())
    }

    async fn text(&self, element: &Selector) -> Result<String> {
        if *element == self.selectors.tax_id_value {
            return Ok(format!("  {}\n", self.script.tax_id));
        }
        Ok(String::new())
    }

    async fn attribute(&self, element: &Selector, name: &str) -> Result<Option<String>> {
        if *element == self.selectors.download_link && name == "href" {
            return Ok(self.script.href.map(String::from));
        }
        Ok(None)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"png")?;
        self.log.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(Some("https://portal.example/create".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// 按顺序为每个会话分配脚本；脚本用完后无法再打开会话
pub struct FakeFactory {
    scripts: Mutex<VecDeque<PortalScript>>,
    pub logs: Mutex<Vec<PortalLogHandle>>,
}

impl FakeFactory {
    pub fn new(scripts: Vec<PortalScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            logs: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> usize {
        self.logs.lock().unwrap().len()
    }
}

#[async_trait]
impl DriverFactory for FakeFactory {
    type Driver = FakePortal;

    async fn open(&self) -> Result<FakePortal> {
        let Some(script) = self.scripts.lock().unwrap().pop_front() else {
            bail!("浏览器启动失败");
        };
        let (portal, log) = FakePortal::new(script);
        self.logs.lock().unwrap().push(log);
        Ok(portal)
    }
}

/// 返回同一份 PDF 的下载器；`failing` 时每次都像服务器报错
#[derive(Default)]
pub struct FakeFetcher {
    pub urls: Mutex<Vec<String>>,
    failing: bool,
}

impl FakeFetcher {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.failing {
            bail!("服务器返回状态码 500 Internal Server Error: {url}");
        }
        Ok(PDF_BYTES.to_vec())
    }
}

/// 按顺序吐出预设验证码，用完后返回 None（相当于超时）
#[derive(Default)]
pub struct FakeOtpSource {
    codes: VecDeque<OtpCode>,
    pub requests: usize,
    pub clears: usize,
}

impl FakeOtpSource {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(|c| OtpCode::new(*c)).collect(),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.codes.len()
    }
}

#[async_trait]
impl OtpSource for FakeOtpSource {
    async fn acquire_code(&mut self, _timeout: Duration) -> Option<OtpCode> {
        self.requests += 1;
        self.codes.pop_front()
    }

    async fn clear_all(&mut self) -> bool {
        self.clears += 1;
        false
    }
}
