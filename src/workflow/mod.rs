//! 流程层（Workflow）
//!
//! 定义"一条声明"的完整处理流程，不关心批次

pub mod form_session;
pub mod retry;
pub mod session_state;

pub use form_session::{FormSession, SessionEnv, SessionOutcome, SessionSettings};
pub use retry::{RetryBudget, RetryPolicy};
pub use session_state::SessionState;
