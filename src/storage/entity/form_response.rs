use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub farmer_id: String,
    pub district: String,
    pub village: String,
    #[sea_orm(nullable)]
    pub ea_code: Option<String>,
    pub season_year: String,
    pub crop_type: String, // 展示用，由 selected_crops 拼接而来
    pub form_data: String, // JSON: selected_crops + crop_data
    pub submission_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
