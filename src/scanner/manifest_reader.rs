use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use crate::models::Manifest;

/// 读取 package.json 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestRead {
    Found(Manifest),

    /// 目录中没有清单
    Missing,

    /// 清单存在但无法读取或解析
    Malformed(String),
}

/// 读取并解析清单文件（会跟随符号链接）
pub async fn read_manifest(manifest_path: &Path) -> ManifestRead {
    let content = match fs::read_to_string(manifest_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return ManifestRead::Missing,
        Err(err) => return ManifestRead::Malformed(err.to_string()),
    };

    let json = match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(json) => json,
        Err(err) => return ManifestRead::Malformed(err.to_string()),
    };

    match Manifest::from_json(&json) {
        Some(manifest) => ManifestRead::Found(manifest),
        None => ManifestRead::Malformed("package.json 顶层不是对象".to_string()),
    }
}
