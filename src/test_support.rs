//! 数据库相关测试的公共工具

#![cfg(test)]

use crate::config::CropMatch;
use crate::linking::model::Coordinate;
use crate::linking::source::SqliteLinkSource;
use crate::linking::Linker;
use crate::storage::entity::field_boundary;
use crate::storage::establish_connection;
use crate::storage::repository::{FieldBoundaryRepository, FormResponseRepository};
use crate::validate::{BoundarySubmission, FormSubmission};
use sea_orm::{ActiveModelTrait, DatabaseConnection, NotSet, Set};
use serde_json::json;
use std::sync::Arc;

/// 新建内存数据库（两张表已创建）
pub async fn test_db() -> DatabaseConnection {
    establish_connection("sqlite::memory:").await.unwrap()
}

pub fn linker(db: &DatabaseConnection, mode: CropMatch) -> Linker {
    Linker::new(Arc::new(SqliteLinkSource::new(Arc::new(db.clone()), mode)))
}

pub fn square_plot() -> Vec<Coordinate> {
    vec![
        Coordinate(-13.85, -171.75),
        Coordinate(-13.85, -171.749),
        Coordinate(-13.851, -171.749),
        Coordinate(-13.851, -171.75),
    ]
}

/// 合法的提交，每个作物带一份简单的产量数据
pub fn form_submission(farmer_id: &str, crops: &[&str]) -> FormSubmission {
    let crop_data = crops
        .iter()
        .map(|c| {
            let attrs = json!({"qty_harvested": 10, "unit": "Kg", "price_per_unit": 2.0});
            (c.to_string(), attrs.as_object().cloned().unwrap())
        })
        .collect();
    FormSubmission {
        farmer_id: farmer_id.to_string(),
        district: "Vaimauga West".to_string(),
        village: "Vailima".to_string(),
        ea_code: Some("10208".to_string()),
        season_year: "2024/25".to_string(),
        selected_crops: crops.iter().map(|c| c.to_string()).collect(),
        crop_data,
        submission_date: None,
    }
}

pub fn boundary_submission(farmer_id: &str, crop: &str, area: Option<f64>) -> BoundarySubmission {
    BoundarySubmission {
        farmer_id: farmer_id.to_string(),
        field_name: format!("{} plot", crop.trim()),
        field_type: "Plantation".to_string(),
        crop_type: Some(crop.to_string()),
        coordinates: square_plot(),
        area_estimate: area,
        notes: None,
        creation_date: None,
    }
}

/// 绕过校验与 crop_type 清理，原样写入一条没有面积的边界
pub async fn insert_raw_boundary(db: &DatabaseConnection, farmer_id: &str, crop: &str, name: &str) {
    field_boundary::ActiveModel {
        id: NotSet,
        farmer_id: Set(farmer_id.to_string()),
        field_name: Set(name.to_string()),
        field_type: Set("Garden".to_string()),
        crop_type: Set(crop.to_string()),
        coordinates: Set("[]".to_string()),
        area_estimate: Set(None),
        notes: Set(None),
        creation_date: Set("2025-03-02T09:00:00".to_string()),
    }
    .insert(db)
    .await
    .unwrap();
}

/// 关联报告中的样例数据：
/// - EA10208-HH0012：Coconut（120 Each，一块 2.0 的田）和 Cocoa（40 Kg，一块 1.0 的田）
/// - EA10208-HH0013：Kava（30 Kg），两块田都没有面积
/// - EA10208-HH0014：只有一块 `Other` 边界，没有表单
pub async fn seed_report_sample(db: &DatabaseConnection) {
    let mut hh12 = form_submission("EA10208-HH0012", &["Coconut", "Cocoa"]);
    hh12.crop_data.insert(
        "Coconut".to_string(),
        json!({"growth_mode": "Mixed crop", "qty_harvested": 120, "unit": "Each", "price_per_unit": 1.5})
            .as_object()
            .cloned()
            .unwrap(),
    );
    hh12.crop_data.insert(
        "Cocoa".to_string(),
        json!({"growth_mode": "Single crop", "qty_harvested": 40, "unit": "Kg"})
            .as_object()
            .cloned()
            .unwrap(),
    );
    hh12.submission_date = Some("2025-03-01T10:00:00".to_string());
    FormResponseRepository::insert(db, &hh12).await.unwrap();

    let mut hh13 = form_submission("EA10208-HH0013", &["Kava"]);
    hh13.crop_data.insert(
        "Kava".to_string(),
        json!({"qty_harvested": 30, "unit": "Kg"})
            .as_object()
            .cloned()
            .unwrap(),
    );
    hh13.submission_date = Some("2025-03-01T11:00:00".to_string());
    FormResponseRepository::insert(db, &hh13).await.unwrap();

    FieldBoundaryRepository::insert(db, &boundary_submission("EA10208-HH0012", "Coconut", Some(2.0)))
        .await
        .unwrap();
    FieldBoundaryRepository::insert(db, &boundary_submission("EA10208-HH0012", "Cocoa", Some(1.0)))
        .await
        .unwrap();
    insert_raw_boundary(db, "EA10208-HH0013", "Kava", "Kava upper").await;
    insert_raw_boundary(db, "EA10208-HH0013", "Kava", "Kava lower").await;
    FieldBoundaryRepository::insert(db, &boundary_submission("EA10208-HH0014", "Other", Some(0.5)))
        .await
        .unwrap();
}
