//! 基础设施层（Infrastructure）
//!
//! 持有稀缺的外部资源，只暴露能力：OCR、通知中心、文档下载

pub mod fetcher;
pub mod notification;
pub mod ocr;
#[cfg(windows)]
pub mod windows_surface;

pub use fetcher::{ArtifactFetcher, HttpFetcher};
pub use notification::{CaptureRegion, DisplayBounds, NotificationSurface};
pub use ocr::{OcrEngine, TesseractCli};
#[cfg(windows)]
pub use windows_surface::WindowsNotificationCenter;
