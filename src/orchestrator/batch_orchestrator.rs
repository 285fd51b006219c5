//! 批量声明编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **顺序调度**：逐行、逐条打开 FormSession，同一时间只有一个会话
//! 2. **通知清理**：每条声明前后都清空一次通知中心，不论成败
//! 3. **失败隔离**：单条失败（包括浏览器打不开）只记录，不中断批次
//! 4. **台账持久化**：每条结束后重写批次台账，每行结束后写分组台账

use std::path::Path;

use tracing::{error, info, warn};

use crate::browser::DriverFactory;
use crate::error::DeclarationError;
use crate::models::{BatchPlan, Credentials, DeclarationRequest, DeclarationResult};
use crate::services::{OtpSource, ReportWriter};
use crate::utils::logging;
use crate::workflow::{FormSession, SessionEnv};

/// 批量声明编排器
pub struct BatchOrchestrator<'a, F: DriverFactory> {
    factory: &'a F,
    env: SessionEnv<'a>,
    reports: &'a ReportWriter,
    ledger: Vec<DeclarationResult>,
}

impl<'a, F: DriverFactory> BatchOrchestrator<'a, F> {
    pub fn new(factory: &'a F, env: SessionEnv<'a>, reports: &'a ReportWriter) -> Self {
        Self {
            factory,
            env,
            reports,
            ledger: Vec::new(),
        }
    }

    /// 处理整个批次，返回按处理顺序排列的结果台账
    pub async fn run(
        mut self,
        plan: &BatchPlan,
        credentials: &Credentials,
        download_root: &Path,
        filename: &str,
        otp: &mut dyn OtpSource,
    ) -> Vec<DeclarationResult> {
        let total_rows = plan.rows.len();

        for row_index in 0..total_rows {
            let requests = plan.requests_for_row(row_index, credentials, download_root, filename);
            if requests.is_empty() {
                continue;
            }
            logging::log_group_start(row_index + 1, total_rows, requests.len());

            let mut group = Vec::with_capacity(requests.len());
            for request in &requests {
                let result = self.process_one(request, otp).await;
                group.push(result.clone());
                self.ledger.push(result);
                self.persist_ledger().await;
            }

            let success = group.iter().filter(|r| r.is_success()).count();
            if let Err(e) = self
                .reports
                .write_group(&requests[0].destination_dir, row_index + 1, &group)
                .await
            {
                warn!("第 {} 行结果写入失败: {:#}", row_index + 1, e);
            }
            logging::log_group_complete(row_index + 1, success, group.len());
        }

        // 空批次也要留下一份报告
        self.persist_ledger().await;
        self.ledger
    }

    /// 处理单条声明，失败转换为带分类的结果
    async fn process_one(
        &self,
        request: &DeclarationRequest,
        otp: &mut dyn OtpSource,
    ) -> DeclarationResult {
        let ctx = request.ctx();
        otp.clear_all().await;

        let result = match self.open_session(request).await {
            Ok(session) => {
                let outcome = session.run(otp).await;
                info!(
                    "{} 会话结束于 {} (经过 {} 个状态)",
                    ctx,
                    outcome.final_state,
                    outcome.visited.len()
                );
                match outcome.result {
                    Ok(document) => DeclarationResult::succeeded(request, document),
                    Err(e) => DeclarationResult::failed(request, &e),
                }
            }
            Err(e) => {
                error!("{} ❌ {}", ctx, e);
                DeclarationResult::failed(request, &e)
            }
        };

        otp.clear_all().await;
        result
    }

    async fn open_session<'r>(
        &'r self,
        request: &'r DeclarationRequest,
    ) -> Result<FormSession<'r, F::Driver>, DeclarationError> {
        let scratch = tempfile::Builder::new()
            .prefix("declaration_")
            .tempdir()
            .map_err(|e| DeclarationError::SessionUnavailable { source: e.into() })?;

        let driver = self
            .factory
            .open()
            .await
            .map_err(|e| DeclarationError::SessionUnavailable { source: e.into() })?;

        Ok(FormSession::new(driver, scratch, self.env, request))
    }

    async fn persist_ledger(&self) {
        if let Err(e) = self.reports.write_ledger(&self.ledger).await {
            warn!("批次台账写入失败: {:#}", e);
        }
    }
}
