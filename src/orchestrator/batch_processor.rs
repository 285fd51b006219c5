//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、加载批次文件和选择器
//! 2. **资源创建**：验证码通道、浏览器启动器、下载器，整个进程各一个
//! 3. **向下委托**：交给 BatchOrchestrator 逐条处理
//! 4. **全局统计**：汇总成功/失败数量
//!
//! 输入文件缺失在 `initialize` 阶段直接返回错误，此时还没有打开任何浏览器

use anyhow::Result;
use chrono::Local;
use tracing::info;

use crate::browser::{ChromeLauncher, DriverFactory};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{ArtifactFetcher, HttpFetcher, NotificationSurface, TesseractCli};
use crate::models::{load_batch_file, BatchPlan, DeclarationResult, PortalSelectors};
use crate::orchestrator::BatchOrchestrator;
use crate::services::{OtpChannel, OtpSettings, OtpSource, ReportWriter};
use crate::utils::logging;
use crate::workflow::{SessionEnv, SessionSettings};

/// 应用主结构
pub struct App {
    config: Config,
    plan: BatchPlan,
    selectors: PortalSelectors,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;

        let plan = load_batch_file(&config.batch_file).await?;

        let selectors = match &config.selectors_file {
            Some(path) => {
                info!("使用自定义选择器: {}", path.display());
                PortalSelectors::load(path).await?
            }
            None => PortalSelectors::default(),
        };

        Ok(Self {
            config,
            plan,
            selectors,
        })
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    /// 运行应用主逻辑（Windows 通知中心）
    #[cfg(windows)]
    pub async fn run(&self) -> Result<Vec<DeclarationResult>> {
        self.run_with_surface(crate::infrastructure::WindowsNotificationCenter::new())
            .await
    }

    /// 通知中心自动化只支持 Windows
    #[cfg(not(windows))]
    pub async fn run(&self) -> Result<Vec<DeclarationResult>> {
        Err(crate::error::AppError::UnsupportedPlatform {
            platform: std::env::consts::OS,
        }
        .into())
    }

    /// 使用指定的通知中心运行，OCR、浏览器和下载器使用真实实现
    pub async fn run_with_surface<S: NotificationSurface>(
        &self,
        surface: S,
    ) -> Result<Vec<DeclarationResult>> {
        let ocr = TesseractCli::new(&self.config.tesseract_cmd);
        let settings = OtpSettings::from_config(&self.config)?;
        let mut channel = OtpChannel::open(surface, ocr, settings).await?;

        let launcher = ChromeLauncher::new(&self.config);
        let fetcher = HttpFetcher::new()?;

        self.run_with(&launcher, &fetcher, &mut channel).await
    }

    /// 使用给定的能力实现处理整个批次
    pub async fn run_with<F: DriverFactory>(
        &self,
        factory: &F,
        fetcher: &dyn ArtifactFetcher,
        otp: &mut dyn OtpSource,
    ) -> Result<Vec<DeclarationResult>> {
        logging::log_startup(&self.config, self.plan.total_declarations());

        let session_settings = SessionSettings::from_config(&self.config);
        let env = SessionEnv {
            settings: &session_settings,
            selectors: &self.selectors,
            fetcher,
        };
        let reports = ReportWriter::new(&self.config.report_dir, Local::now());

        let ledger = BatchOrchestrator::new(factory, env, &reports)
            .run(
                &self.plan,
                &self.config.credentials,
                &self.config.download_dir,
                &self.config.declaration_filename,
                otp,
            )
            .await;

        let success = ledger.iter().filter(|r| r.is_success()).count();
        logging::print_final_stats(
            success,
            ledger.len() - success,
            &reports.ledger_path(),
            &self.config.log_dir,
        );

        Ok(ledger)
    }
}
