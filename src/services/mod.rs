//! 业务能力层（Services）
//!
//! 每个服务只提供一种能力，不关心流程顺序

pub mod document_store;
pub mod otp_channel;
pub mod report_writer;

pub use otp_channel::{OtpChannel, OtpSettings, OtpSource};
pub use report_writer::ReportWriter;
