//! 文档存放服务 - 业务能力层
//!
//! 负责把下载好的文件放进目标目录，遇到重名时追加 " (n)" 后缀

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// 返回 `dir` 下可用的文件路径
///
/// `declaration.pdf` 已存在时依次尝试 `declaration (1).pdf`、`declaration (2).pdf`，
/// 取最小的空闲编号
pub async fn unique_destination(dir: &Path, filename: &str) -> Result<PathBuf> {
    let candidate = dir.join(filename);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let (stem, extension) = split_filename(filename);
    let mut n = 1u32;
    loop {
        let name = match extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = dir.join(name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

fn split_filename(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], Some(&filename[idx + 1..])),
        _ => (filename, None),
    }
}

/// 把 `source` 移动到 `dir/filename`（必要时改名），返回最终路径
///
/// 跨文件系统时 rename 会失败，退回到复制后删除
pub async fn move_into(source: &Path, dir: &Path, filename: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("无法创建目录: {}", dir.display()))?;

    let destination = unique_destination(dir, filename).await?;

    if let Err(e) = tokio::fs::rename(source, &destination).await {
        debug!("rename 失败 ({}), 改为复制", e);
        tokio::fs::copy(source, &destination)
            .await
            .with_context(|| {
                format!(
                    "无法复制 {} 到 {}",
                    source.display(),
                    destination.display()
                )
            })?;
        tokio::fs::remove_file(source).await.ok();
    }

    info!("📄 文档已保存: {}", destination.display());
    Ok(destination)
}
