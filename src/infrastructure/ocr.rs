//! OCR 能力 - 基础设施层
//!
//! 只暴露"图片 → 文本"的能力，不认识验证码

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// `languages` 形如 `ell+deu+eng`
    async fn recognize_text(&self, image: &RgbaImage, languages: &str) -> Result<String>;
}

/// 调用 Tesseract 命令行
///
/// 可执行文件路径在构造时确定，不依赖全局设置
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
}

impl TesseractCli {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize_text(&self, image: &RgbaImage, languages: &str) -> Result<String> {
        let input = tempfile::Builder::new()
            .prefix("otp_snapshot_")
            .suffix(".png")
            .tempfile()
            .context("无法创建 OCR 临时文件")?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .context("无法写入 OCR 临时图片")?;

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(languages)
            .output()
            .await
            .with_context(|| format!("无法启动 Tesseract: {}", self.executable.display()))?;

        if !output.status.success() {
            anyhow::bail!(
                "Tesseract 退出码 {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR 识别出 {} 个字符", text.chars().count());
        Ok(text)
    }
}
