//! # Declaration Submit
//!
//! 批量提交政府门户"责任声明"表单的自动化工具：登录、填写、短信验证码、下载 PDF
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 浏览器驱动（`BrowserDriver` trait + chromiumoxide 实现）
//! - `infrastructure/` - OCR、桌面通知中心、文档下载，只暴露能力
//!
//! ### ② 业务能力层（Services）
//! - `OtpChannel` - 轮询通知中心、OCR 识别、提取验证码、清空通知
//! - `document_store` - 文档落盘（重名追加 " (n)"）
//! - `ReportWriter` - 结果台账（HTML + JSON）
//!
//! ### ③ 流程层（Workflow）
//! - `FormSession` - 单条声明的状态机（登录 → 核对 → 填写 → 验证码 → 下载）
//! - `RetryPolicy` - 有界重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_orchestrator` - 逐条调度，隔离失败，持久化台账
//! - `orchestrator/batch_processor` - 应用入口，创建全部共享资源
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, DeclarationError, FailureKind};
pub use models::{DeclarationRequest, DeclarationResult};
pub use orchestrator::{App, BatchOrchestrator};
pub use workflow::{FormSession, SessionOutcome, SessionState};
