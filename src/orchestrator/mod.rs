//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 加载批次文件与选择器
//! - 创建唯一的验证码通道、浏览器启动器和下载器
//! - 输出全局统计信息
//!
//! ### `batch_orchestrator` - 批量声明编排器
//! - 逐行、逐条打开 FormSession
//! - 每条前后清空通知中心
//! - 记录结果并持久化台账
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (App)
//!     ↓
//! batch_orchestrator (处理 BatchPlan)
//!     ↓
//! workflow::FormSession (处理单条声明)
//!     ↓
//! services (能力层：验证码通道 / 文档存放 / 报告)
//!     ↓
//! infrastructure (基础设施：OCR / 通知中心 / 下载)
//! ```
//!
//! ## 设计原则
//!
//! 1. **严格顺序**：同一时间只有一个浏览器会话和一个验证码轮询
//! 2. **资源隔离**：只有编排层创建浏览器会话和验证码通道
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod batch_orchestrator;
pub mod batch_processor;

pub use batch_orchestrator::BatchOrchestrator;
pub use batch_processor::App;
