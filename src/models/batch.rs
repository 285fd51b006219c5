use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{Credentials, DeclarationRequest};

/// 一行中的一条声明：接收方 + 声明正文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationEntry {
    pub receiver: String,
    pub text: String,
}

/// 输入文件中的一行，同一行的声明保存在同一个目录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRow {
    /// 下载根目录下的子目录，同时作为分组键
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub declarations: Vec<DeclarationEntry>,
}

impl DeclarationRow {
    /// 本行文档的目标目录
    pub fn destination_dir(&self, download_root: &Path) -> PathBuf {
        match self.folder.as_deref().map(str::trim) {
            Some(folder) if !folder.is_empty() => download_root.join(folder),
            _ => download_root.to_path_buf(),
        }
    }
}

/// 整个批次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    #[serde(default)]
    pub rows: Vec<DeclarationRow>,
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl BatchPlan {
    pub fn total_declarations(&self) -> usize {
        self.rows.iter().map(|r| r.declarations.len()).sum()
    }

    /// 把第 `row_index` 行（从 0 开始）展开为声明请求
    pub fn requests_for_row(
        &self,
        row_index: usize,
        credentials: &Credentials,
        download_root: &Path,
        filename: &str,
    ) -> Vec<DeclarationRequest> {
        let Some(row) = self.rows.get(row_index) else {
            return Vec::new();
        };
        let destination_dir = row.destination_dir(download_root);

        row.declarations
            .iter()
            .enumerate()
            .map(|(column, entry)| DeclarationRequest {
                row: row_index + 1,
                column: column + 1,
                receiver: entry.receiver.clone(),
                text: entry.text.clone(),
                credentials: credentials.clone(),
                destination_dir: destination_dir.clone(),
                filename: Some(filename.to_string()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            username: "user".into(),
            password: "secret".into(),
            tax_id: "999888777".into(),
            email: "user@example.com".into(),
        }
    }

    #[test]
    fn test_folder_selects_destination() {
        let plan = BatchPlan {
            rows: vec![
                DeclarationRow {
                    folder: Some("2025".into()),
                    declarations: vec![DeclarationEntry {
                        receiver: "A".into(),
                        text: "t1".into(),
                    }],
                },
                DeclarationRow {
                    folder: Some("  ".into()),
                    declarations: vec![
                        DeclarationEntry {
                            receiver: "B".into(),
                            text: "t2".into(),
                        },
                        DeclarationEntry {
                            receiver: "C".into(),
                            text: "t3".into(),
                        },
                    ],
                },
            ],
            file_path: None,
        };
        let root = Path::new("downloads");

        let first = plan.requests_for_row(0, &credentials(), root, "declaration.pdf");
        assert_eq!(first[0].destination_dir, root.join("2025"));

        let second = plan.requests_for_row(1, &credentials(), root, "declaration.pdf");
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].destination_dir, root.to_path_buf());
        assert_eq!((second[1].row, second[1].column), (2, 2));
        assert_eq!(plan.total_declarations(), 3);
        assert!(plan.requests_for_row(5, &credentials(), root, "x.pdf").is_empty());
    }
}
