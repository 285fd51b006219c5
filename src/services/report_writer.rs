//! 结果报告服务 - 业务能力层
//!
//! 只负责把结果台账写成 HTML + JSON，不关心流程

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::debug;

use crate::models::DeclarationResult;

/// 结果报告写入服务
///
/// - 批次台账：`<report_dir>/bulk_declare_<YYYYmmddTHHMM>.html/.json`，每处理完一条就整体重写
/// - 分组台账：`<group_dir>/<row>_result.html/.json`
pub struct ReportWriter {
    report_dir: PathBuf,
    stamp: String,
}

impl ReportWriter {
    pub fn new(report_dir: impl Into<PathBuf>, started_at: DateTime<Local>) -> Self {
        Self {
            report_dir: report_dir.into(),
            stamp: started_at.format("%Y%m%dT%H%M").to_string(),
        }
    }

    /// 批次台账的 HTML 路径
    pub fn ledger_path(&self) -> PathBuf {
        self.report_dir
            .join(format!("bulk_declare_{}.html", self.stamp))
    }

    pub async fn write_ledger(&self, results: &[DeclarationResult]) -> Result<PathBuf> {
        let html = self.ledger_path();
        write_pair(&html, "批量声明结果", results).await?;
        debug!("台账已更新: {} ({} 条)", html.display(), results.len());
        Ok(html)
    }

    /// 写入某一行（分组）的结果到该组的目标目录
    pub async fn write_group(
        &self,
        group_dir: &Path,
        row: usize,
        results: &[DeclarationResult],
    ) -> Result<PathBuf> {
        let html = group_dir.join(format!("{row}_result.html"));
        write_pair(&html, &format!("第 {row} 行结果"), results).await?;
        Ok(html)
    }
}

async fn write_pair(html_path: &Path, title: &str, results: &[DeclarationResult]) -> Result<()> {
    if let Some(parent) = html_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建目录: {}", parent.display()))?;
    }

    tokio::fs::write(html_path, render_html(title, results))
        .await
        .with_context(|| format!("无法写入 {}", html_path.display()))?;

    let json_path = html_path.with_extension("json");
    let json = serde_json::to_string_pretty(results)?;
    tokio::fs::write(&json_path, json)
        .await
        .with_context(|| format!("无法写入 {}", json_path.display()))?;
    Ok(())
}

/// 渲染结果表格，失败的条目文件列留空
pub fn render_html(title: &str, results: &[DeclarationResult]) -> String {
    let mut rows = String::new();
    for r in results {
        let file = r
            .file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let kind = r.failure_kind.map(|k| k.to_string()).unwrap_or_default();

        rows.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            if r.is_success() { "ok" } else { "failed" },
            r.row,
            r.column,
            escape(&r.receiver),
            escape(r.file_url.as_deref().unwrap_or("")),
            escape(&file),
            kind,
            escape(r.failure_reason.as_deref().unwrap_or("")),
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title>\n\
         <style>table{{border-collapse:collapse}}td,th{{border:1px solid #999;padding:4px}}\
         tr.failed{{background:#fdd}}</style></head>\n<body>\n<h1>{title}</h1>\n\
         <table>\n<tr><th>row</th><th>column</th><th>receiver</th><th>url</th><th>file</th>\
         <th>failure kind</th><th>failure reason</th></tr>\n{rows}</table>\n</body>\n</html>\n",
        title = escape(title),
        rows = rows,
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
