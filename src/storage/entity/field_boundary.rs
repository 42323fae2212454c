use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "field_boundaries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub farmer_id: String,
    pub field_name: String,
    pub field_type: String,
    pub crop_type: String,
    pub coordinates: String, // JSON array of [lat, lon]
    #[sea_orm(nullable)]
    pub area_estimate: Option<f64>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub creation_date: String,
}

// 与 form_responses 之间没有外键，只按 (farmer_id, crop_type) 约定关联
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
