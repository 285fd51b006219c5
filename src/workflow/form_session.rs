//! 单条声明的表单会话 - 流程层
//!
//! 核心职责：驱动一个浏览器会话走完整个声明流程
//!
//! 流程顺序：
//! 1. 打开门户 → 接受 Cookie（可选）
//! 2. 登录 → 核对税号
//! 3. 填写邮箱、声明正文、接收方
//! 4. 申请签发 → 选择短信验证
//! 5. 验证码子循环（有界重试）
//! 6. 下载 PDF 并放入目标目录
//!
//! 会话独占浏览器和临时目录，`run` 结束时无论成败都会释放

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::browser::BrowserDriver;
use crate::config::Config;
use crate::error::DeclarationError;
use crate::infrastructure::ArtifactFetcher;
use crate::models::{DeclarationCtx, DeclarationRequest, OtpCode, PortalSelectors, SavedDocument, Selector};
use crate::services::document_store;
use crate::services::OtpSource;
use crate::utils::logging::truncate_text;
use crate::workflow::retry::RetryPolicy;
use crate::workflow::session_state::SessionState;

/// 下载到临时目录时使用的文件名
const SCRATCH_FILENAME: &str = "declaration.pdf";

/// 会话运行参数
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub portal_url: String,
    /// 每一步查找元素的超时
    pub web_timeout: Duration,
    /// 提交验证码后等待错误提示的时间
    pub confirmation_wait: Duration,
    pub otp_timeout: Duration,
    pub otp_retries: u32,
    /// 导航与下载的瞬时重试
    pub step_retry: RetryPolicy,
    /// 设置后，失败时把截图保存到该目录
    pub failure_screenshot_dir: Option<PathBuf>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            portal_url: config.portal_url.clone(),
            web_timeout: config.web_timeout,
            confirmation_wait: config.confirmation_wait,
            otp_timeout: config.otp_timeout,
            otp_retries: config.otp_retries,
            step_retry: RetryPolicy::new(config.step_retries + 1, Duration::from_secs(2)),
            failure_screenshot_dir: config
                .failure_screenshots
                .then(|| config.debug_dir.clone()),
        }
    }
}

/// 会话共享的只读环境（整批声明共用）
#[derive(Clone, Copy)]
pub struct SessionEnv<'a> {
    pub settings: &'a SessionSettings,
    pub selectors: &'a PortalSelectors,
    pub fetcher: &'a dyn ArtifactFetcher,
}

/// 会话结束时的结果
#[derive(Debug)]
pub struct SessionOutcome {
    pub final_state: SessionState,
    /// 依次到达过的状态，从 Init 开始
    pub visited: Vec<SessionState>,
    pub result: Result<SavedDocument, DeclarationError>,
}

/// 单条声明的表单会话
pub struct FormSession<'a, D: BrowserDriver> {
    driver: D,
    scratch: TempDir,
    env: SessionEnv<'a>,
    request: &'a DeclarationRequest,
    ctx: DeclarationCtx,
    state: SessionState,
    visited: Vec<SessionState>,
}

impl<'a, D: BrowserDriver> FormSession<'a, D> {
    pub fn new(
        driver: D,
        scratch: TempDir,
        env: SessionEnv<'a>,
        request: &'a DeclarationRequest,
    ) -> Self {
        Self {
            driver,
            scratch,
            env,
            request,
            ctx: request.ctx(),
            state: SessionState::Init,
            visited: vec![SessionState::Init],
        }
    }

    /// 走完整个流程；消费会话，返回前关闭浏览器并删除临时目录
    pub async fn run(mut self, otp: &mut dyn OtpSource) -> SessionOutcome {
        info!(
            "{} 🚀 开始处理: {}",
            self.ctx,
            truncate_text(&self.request.text, 60)
        );

        let mut document = None;
        let mut failure = None;

        while !self.state.is_terminal() {
            let Some(target) = self.state.next() else {
                break;
            };
            debug!("{} → 进入 {}", self.ctx, target);
            match self.step(target, otp).await {
                Ok(saved) => {
                    if saved.is_some() {
                        document = saved;
                    }
                    self.state = target;
                    self.visited.push(target);
                    info!("{} ✓ {}", self.ctx, target);
                }
                Err(e) => {
                    self.on_failure(target, &e).await;
                    failure = Some(e);
                }
            }
        }

        let final_state = self.state;
        let visited = std::mem::take(&mut self.visited);
        self.release().await;

        let result = match (failure, document) {
            (Some(e), _) => Err(e),
            (None, Some(doc)) => Ok(doc),
            (None, None) => Err(DeclarationError::download_failed(
                "",
                "流程结束但没有保存任何文档",
            )),
        };

        SessionOutcome {
            final_state,
            visited,
            result,
        }
    }

    /// 执行到达 `target` 所需的动作，只有最后一步会产出文档
    async fn step(
        &self,
        target: SessionState,
        otp: &mut dyn OtpSource,
    ) -> Result<Option<SavedDocument>, DeclarationError> {
        let s = self.env.selectors;
        let request = self.request;

        match target {
            SessionState::CookiesAccepted => {
                self.open_portal(target).await?;
                self.accept_cookies(target).await?;
            }
            SessionState::LoggedIn => {
                self.click_on(target, &s.login_button).await?;
                self.click_on(target, &s.auth_provider).await?;
                self.type_into(target, &s.username_input, &request.credentials.username)
                    .await?;
                self.type_into(target, &s.password_input, &request.credentials.password)
                    .await?;
                self.click_on(target, &s.login_submit).await?;
            }
            SessionState::IdentityVerified => {
                self.click_on(target, &s.consent_continue).await?;
                self.click_on(target, &s.consent_send).await?;
                self.verify_identity(target).await?;
                self.click_on(target, &s.continue_button).await?;
            }
            SessionState::EmailSet => {
                self.type_into(target, &s.email_input, &request.credentials.email)
                    .await?;
                self.click_on(target, &s.continue_button).await?;
            }
            SessionState::DeclarationTextSet => {
                self.type_into(target, &s.declaration_text, &request.text)
                    .await?;
                self.click_on(target, &s.continue_button).await?;
            }
            SessionState::RecipientSet => {
                self.type_into(target, &s.recipient_input, &request.receiver)
                    .await?;
                self.click_on(target, &s.continue_button).await?;
            }
            SessionState::IssuanceRequested => {
                self.click_on(target, &s.issue_button).await?;
            }
            SessionState::OtpRequested => {
                self.click_on(target, &s.sms_option).await?;
                self.click_on(target, &s.continue_button).await?;
            }
            SessionState::OtpSubmitted => {
                self.submit_otp_with_retry(target, otp).await?;
            }
            SessionState::DocumentSaved => {
                return self.save_document(target).await.map(Some);
            }
            SessionState::Init | SessionState::Failed(_) => {}
        }

        Ok(None)
    }

    // ========== 页面操作辅助方法 ==========

    async fn find(
        &self,
        step: SessionState,
        selector: &Selector,
    ) -> Result<D::Element, DeclarationError> {
        self.driver
            .find_element(selector, self.env.settings.web_timeout)
            .await
            .map_err(|e| DeclarationError::browser(step, e))?
            .ok_or_else(|| DeclarationError::element_not_found(step, selector))
    }

    async fn click_on(&self, step: SessionState, selector: &Selector) -> Result<(), DeclarationError> {
        let element = self.find(step, selector).await?;
        self.driver
            .click(&element)
            .await
            .map_err(|e| DeclarationError::browser(step, e))
    }

    async fn type_into(
        &self,
        step: SessionState,
        selector: &Selector,
        text: &str,
    ) -> Result<(), DeclarationError> {
        let element = self.find(step, selector).await?;
        self.driver
            .type_text(&element, text)
            .await
            .map_err(|e| DeclarationError::browser(step, e))
    }

    // ========== 各步骤 ==========

    async fn open_portal(&self, step: SessionState) -> Result<(), DeclarationError> {
        let driver = &self.driver;
        let url = self.env.settings.portal_url.as_str();
        self.env
            .settings
            .step_retry
            .run("打开门户", move || driver.navigate(url))
            .await
            .map_err(|e| DeclarationError::browser(step, e))
    }

    /// Cookie 横幅不一定出现，找不到不算失败
    async fn accept_cookies(&self, step: SessionState) -> Result<(), DeclarationError> {
        let banner = self
            .driver
            .find_element(&self.env.selectors.cookie_accept, self.env.settings.web_timeout)
            .await
            .map_err(|e| DeclarationError::browser(step, e))?;

        match banner {
            Some(button) => {
                self.driver
                    .click(&button)
                    .await
                    .map_err(|e| DeclarationError::browser(step, e))?;
                debug!("{} 已接受 Cookie", self.ctx);
            }
            None => debug!("{} 未出现 Cookie 横幅", self.ctx),
        }
        Ok(())
    }

    async fn verify_identity(&self, step: SessionState) -> Result<(), DeclarationError> {
        let element = self.find(step, &self.env.selectors.tax_id_value).await?;
        let actual = self
            .driver
            .text(&element)
            .await
            .map_err(|e| DeclarationError::browser(step, e))?;
        let actual = actual.trim();
        let expected = self.request.credentials.tax_id.trim();

        if actual != expected {
            return Err(DeclarationError::IdentityMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        debug!("{} 税号核对通过: {}", self.ctx, actual);
        Ok(())
    }

    /// 验证码子循环
    ///
    /// 每拿到一个验证码就消耗一次预算；已经被拒绝过的验证码不再提交，直接记一次拒绝
    async fn submit_otp_with_retry(
        &self,
        step: SessionState,
        otp: &mut dyn OtpSource,
    ) -> Result<(), DeclarationError> {
        let settings = self.env.settings;
        let mut budget = RetryPolicy::new(settings.otp_retries, Duration::ZERO).budget();
        let mut rejected: HashSet<OtpCode> = HashSet::new();

        loop {
            let Some(code) = otp.acquire_code(settings.otp_timeout).await else {
                return Err(DeclarationError::OtpNotReceived {
                    timeout_secs: settings.otp_timeout.as_secs(),
                });
            };

            let accepted = if rejected.contains(&code) {
                warn!("{} 验证码 {} 已被拒绝过，不再提交", self.ctx, code);
                false
            } else {
                self.submit_code(step, &code).await?
            };

            if accepted {
                info!("{} ✓ 验证码 {} 已通过", self.ctx, code);
                return Ok(());
            }

            rejected.insert(code);
            if !budget.consume() {
                return Err(DeclarationError::OtpRejectedTooManyTimes {
                    attempts: budget.used(),
                });
            }
            warn!(
                "{} ⚠️ 验证码被拒绝，剩余 {} 次机会",
                self.ctx,
                budget.remaining()
            );
        }
    }

    /// 提交一次验证码，返回是否被接受
    ///
    /// 确认等待时间内没有出现错误提示即视为通过
    async fn submit_code(&self, step: SessionState, code: &OtpCode) -> Result<bool, DeclarationError> {
        let s = self.env.selectors;
        self.type_into(step, &s.code_input, code.as_str()).await?;
        self.click_on(step, &s.confirm_button).await?;

        let indicator = self
            .driver
            .find_element(&s.wrong_code_indicator, self.env.settings.confirmation_wait)
            .await
            .map_err(|e| DeclarationError::browser(step, e))?;

        Ok(indicator.is_none())
    }

    async fn save_document(&self, step: SessionState) -> Result<SavedDocument, DeclarationError> {
        let link = self.find(step, &self.env.selectors.download_link).await?;
        let href = self
            .driver
            .attribute(&link, "href")
            .await
            .map_err(|e| DeclarationError::browser(step, e))?
            .ok_or_else(|| DeclarationError::download_failed("", "下载链接没有 href 属性"))?;

        let file_url = self.resolve_url(&href).await;
        info!("{} 📥 下载文档: {}", self.ctx, file_url);

        let fetcher = self.env.fetcher;
        let url = file_url.as_str();
        let bytes = self
            .env
            .settings
            .step_retry
            .run("下载文档", move || fetcher.fetch(url))
            .await
            .map_err(|e| DeclarationError::download_failed_with(&file_url, "请求失败", e))?;

        let scratch_file = self.scratch.path().join(SCRATCH_FILENAME);
        tokio::fs::write(&scratch_file, &bytes)
            .await
            .map_err(|e| {
                DeclarationError::download_failed_with(&file_url, "写入临时文件失败", e.into())
            })?;

        let files = self.count_scratch_files().await.map_err(|e| {
            DeclarationError::download_failed_with(&file_url, "无法读取临时目录", e.into())
        })?;
        if files != 1 {
            return Err(DeclarationError::download_failed(
                &file_url,
                format!("临时目录中应当只有 1 个文件，实际 {files} 个"),
            ));
        }

        let file_path = document_store::move_into(
            &scratch_file,
            &self.request.destination_dir,
            self.request.filename(),
        )
        .await
        .map_err(|e| DeclarationError::download_failed_with(&file_url, "移动文件失败", e))?;

        Ok(SavedDocument {
            file_url,
            file_path,
        })
    }

    /// 相对链接按当前页面地址补全
    async fn resolve_url(&self, href: &str) -> String {
        if let Ok(url) = reqwest::Url::parse(href) {
            return url.to_string();
        }
        let base = self.driver.current_url().await.ok().flatten();
        base.and_then(|base| reqwest::Url::parse(&base).ok())
            .and_then(|base| base.join(href).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| href.to_string())
    }

    async fn count_scratch_files(&self) -> std::io::Result<usize> {
        let mut entries = tokio::fs::read_dir(self.scratch.path()).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }

    // ========== 状态转换钩子 ==========

    async fn on_failure(&mut self, target: SessionState, e: &DeclarationError) {
        let page = self.driver.current_url().await.ok().flatten();
        error!(
            "{} ❌ {} 失败: {} (页面: {})",
            self.ctx,
            target,
            e,
            page.as_deref().unwrap_or("未知")
        );

        self.capture_failure(target).await;
        self.state = SessionState::Failed(e.kind());
        self.visited.push(self.state);
    }

    async fn capture_failure(&self, target: SessionState) {
        let Some(dir) = &self.env.settings.failure_screenshot_dir else {
            return;
        };
        let dir = dir.join(format!("{}_{}", self.request.row, self.request.column));
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("{} 无法创建截图目录: {}", self.ctx, e);
            return;
        }

        let path = dir.join(format!("{}_failure.png", target.slug()));
        match self.driver.screenshot(&path).await {
            Ok(()) => info!("{} 📸 失败截图: {}", self.ctx, path.display()),
            Err(e) => warn!("{} 保存失败截图出错: {:#}", self.ctx, e),
        }
    }

    async fn release(mut self) {
        if let Err(e) = self.driver.close().await {
            warn!("{} 关闭浏览器失败: {:#}", self.ctx, e);
        }
        if let Err(e) = self.scratch.close() {
            warn!("{} 删除临时目录失败: {}", self.ctx, e);
        }
    }
}
