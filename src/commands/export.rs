use crate::app_state::AppEvent;
use crate::linking::{LinkRecord, Linker};
use anyhow::Context;
use log::error;
use std::path::Path;
use tokio::sync::mpsc;

pub async fn write_links(path: &Path, records: &[LinkRecord]) -> anyhow::Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("创建目录失败: {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("写入文件失败: {}", path.display()))?;
    Ok(records.len())
}

pub async fn run(path: &str, linker: &Linker, evt_tx: mpsc::UnboundedSender<AppEvent>) {
    let records = match linker.all_farmer_crop_links().await {
        Ok(r) => r,
        Err(e) => {
            let _ = evt_tx.send(AppEvent::Error(format!("✗ 关联数据生成失败: {}", e)));
            return;
        }
    };

    match write_links(Path::new(path), &records).await {
        Ok(n) => {
            let _ = evt_tx.send(AppEvent::Log(format!("✓ 已导出 {} 条关联记录到 {}", n, path)));
        }
        Err(e) => {
            error!("export {} failed: {:#}", path, e);
            let _ = evt_tx.send(AppEvent::Error(format!("✗ 导出失败: {:#}", e)));
        }
    }
}
