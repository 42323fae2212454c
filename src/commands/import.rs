use crate::app_state::AppEvent;
use crate::storage::repository::{FieldBoundaryRepository, FormResponseRepository};
use crate::validate::{BoundarySubmission, FormSubmission};
use anyhow::Context;
use log::{error, info};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tokio::sync::mpsc;

#[derive(Debug, Default, Deserialize)]
pub struct ImportDocument {
    #[serde(default)]
    pub form_responses: Vec<FormSubmission>,
    #[serde(default)]
    pub field_boundaries: Vec<BoundarySubmission>,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub forms_inserted: usize,
    pub boundaries_inserted: usize,
    pub rejected: Vec<String>,
}

pub async fn load_document(path: &Path) -> anyhow::Result<ImportDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取文件失败: {}", path.display()))?;
    let doc = serde_json::from_str(&text)
        .with_context(|| format!("JSON 解析失败: {}", path.display()))?;
    Ok(doc)
}

/// 逐条校验后写入；不合法的条目收集到 rejected 中，不影响其它条目
pub async fn import_document(
    db: &DatabaseConnection,
    doc: ImportDocument,
) -> anyhow::Result<ImportReport> {
    let mut report = ImportReport::default();

    for (idx, sub) in doc.form_responses.iter().enumerate() {
        if let Err(errors) = sub.validate() {
            report.rejected.push(format!(
                "form_responses[{}] ({}): {}",
                idx,
                sub.farmer_id,
                errors.join("; ")
            ));
            continue;
        }
        FormResponseRepository::insert(db, sub).await?;
        report.forms_inserted += 1;
    }

    for (idx, sub) in doc.field_boundaries.iter().enumerate() {
        if let Err(errors) = sub.validate() {
            report.rejected.push(format!(
                "field_boundaries[{}] ({}/{}): {}",
                idx,
                sub.farmer_id,
                sub.field_name,
                errors.join("; ")
            ));
            continue;
        }
        FieldBoundaryRepository::insert(db, sub).await?;
        report.boundaries_inserted += 1;
    }

    Ok(report)
}

pub async fn run(path: &str, db: &DatabaseConnection, evt_tx: mpsc::UnboundedSender<AppEvent>) {
    let _ = evt_tx.send(AppEvent::Log(format!("正在导入: {}", path)));

    let doc = match load_document(Path::new(path)).await {
        Ok(doc) => doc,
        Err(e) => {
            let _ = evt_tx.send(AppEvent::Error(format!("✗ 导入失败: {:#}", e)));
            return;
        }
    };

    match import_document(db, doc).await {
        Ok(report) => {
            info!(
                "import {}: {} forms, {} boundaries, {} rejected",
                path,
                report.forms_inserted,
                report.boundaries_inserted,
                report.rejected.len()
            );
            let _ = evt_tx.send(AppEvent::Log(format!(
                "✓ 导入完成: 表单 {} 条, 边界 {} 条, 拒绝 {} 条",
                report.forms_inserted,
                report.boundaries_inserted,
                report.rejected.len()
            )));
            for line in report.rejected.iter().take(10) {
                let _ = evt_tx.send(AppEvent::Log(format!("⚠ {}", line)));
            }
        }
        Err(e) => {
            error!("import {} failed: {:#}", path, e);
            let _ = evt_tx.send(AppEvent::Error(format!("✗ 写入数据库失败: {:#}", e)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use std::io::Write;

    const DOC: &str = r#"{
        "form_responses": [
            {"farmer_id": "EA10208-HH0020", "district": "Aana", "village": "Leulumoega",
             "season_year": "2024/25", "selected_crops": ["Banana"],
             "crop_data": {"Banana": {"banana_type": "Fa'i Samoa", "growth_mode": "Mixed crop",
                                      "qty_harvested": 50, "unit": "Bundle"}}},
            {"farmer_id": "x", "district": "", "village": "Leulumoega",
             "season_year": "2024", "selected_crops": []}
        ],
        "field_boundaries": [
            {"farmer_id": "EA10208-HH0020", "field_name": "Banana patch", "field_type": "Garden",
             "crop_type": "Banana",
             "coordinates": [[-13.85, -171.75], [-13.85, -171.749], [-13.851, -171.749]]}
        ]
    }"#;

    #[tokio::test]
    async fn imports_valid_entries_and_reports_rejects() {
        let db = test_db().await;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOC.as_bytes()).unwrap();

        let doc = load_document(file.path()).await.unwrap();
        let report = import_document(&db, doc).await.unwrap();

        assert_eq!(report.forms_inserted, 1);
        assert_eq!(report.boundaries_inserted, 1);
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].starts_with("form_responses[1] (x)"));
        assert_eq!(FormResponseRepository::count(&db).await.unwrap(), 1);
        assert_eq!(FieldBoundaryRepository::count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(load_document(&missing).await.is_err());
    }
}
