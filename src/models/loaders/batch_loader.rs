use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::BatchPlan;

/// 从 TOML 文件加载批次
///
/// 文件不存在属于致命错误，必须在打开任何浏览器会话之前返回
pub async fn load_batch_file(path: &Path) -> AppResult<BatchPlan> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(AppError::InputFileMissing {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::BatchParseFailed {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    let mut plan = parse_batch(&content).map_err(|e| AppError::BatchParseFailed {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    plan.file_path = Some(path.to_path_buf());

    for (index, row) in plan.rows.iter().enumerate() {
        if row.declarations.is_empty() {
            warn!("第 {} 行没有任何声明，将被跳过", index + 1);
        }
    }

    info!(
        "成功加载 {} 行 / {} 条声明: {}",
        plan.rows.len(),
        plan.total_declarations(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(plan)
}

/// 解析批次文本
pub fn parse_batch(content: &str) -> Result<BatchPlan, toml::de::Error> {
    toml::from_str(content)
}
