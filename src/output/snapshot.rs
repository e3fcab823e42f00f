use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::models::{Report, Snapshot};

/// 构建报表快照，时间戳为当前 UTC 时间
pub fn snapshot<'a>(root: &Path, report: &'a Report) -> Snapshot<'a> {
    Snapshot {
        root: root.display().to_string(),
        generated_at: Utc::now(),
        overview: &report.overview,
        rows: &report.rows,
    }
}

/// 把报表写成格式化的 JSON 文件
pub async fn write_snapshot(path: &Path, root: &Path, report: &Report) -> Result<()> {
    let json = serde_json::to_string_pretty(&snapshot(root, report))
        .context("序列化报表失败")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建目录: {}", parent.display()))?;
    }

    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("无法写入文件: {}", path.display()))?;

    tracing::info!("报表已保存到 {}", path.display());
    Ok(())
}
