use crate::config::CropMatch;
use crate::error::LinkError;
use crate::storage::entity::field_boundary::{
    self, ActiveModel as FieldBoundaryActiveModel, Entity as FieldBoundary,
    Model as FieldBoundaryModel,
};
use crate::storage::repository::now_iso;
use crate::validate::BoundarySubmission;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

pub struct FieldBoundaryRepository;

impl FieldBoundaryRepository {
    pub async fn insert(
        db: &DatabaseConnection,
        submission: &BoundarySubmission,
    ) -> Result<i32, LinkError> {
        let coordinates = serde_json::to_string(&submission.coordinates)
            .map_err(|e| LinkError::Validation(vec![format!("coordinates encode: {}", e)]))?;

        let am = FieldBoundaryActiveModel {
            id: NotSet,
            farmer_id: Set(submission.farmer_id.trim().to_string()),
            field_name: Set(submission.field_name.trim().to_string()),
            field_type: Set(submission.field_type.clone()),
            crop_type: Set(submission.effective_crop_type()),
            coordinates: Set(coordinates),
            area_estimate: Set(submission.effective_area()),
            notes: Set(submission.notes.clone().filter(|s| !s.is_empty())),
            creation_date: Set(submission.creation_date.clone().unwrap_or_else(now_iso)),
        };
        let model = am.insert(db).await?;
        Ok(model.id)
    }

    /// 按 (farmer_id, crop_type) 查询边界，按创建时间排序。
    ///
    /// 宽松模式在内存中用 `CropMatch::matches` 过滤：SQLite 的 TRIM/LOWER
    /// 只处理空格和 ASCII，与 `normalize_crop` 不一致。
    pub async fn find_for_crop(
        db: &DatabaseConnection,
        farmer_id: &str,
        crop_type: &str,
        mode: CropMatch,
    ) -> Result<Vec<FieldBoundaryModel>, sea_orm::DbErr> {
        let mut query =
            FieldBoundary::find().filter(field_boundary::Column::FarmerId.eq(farmer_id));
        if mode == CropMatch::Exact {
            query = query.filter(field_boundary::Column::CropType.eq(crop_type));
        }

        let rows = query
            .order_by_asc(field_boundary::Column::CreationDate)
            .order_by_asc(field_boundary::Column::Id)
            .all(db)
            .await?;

        Ok(match mode {
            CropMatch::Exact => rows,
            CropMatch::Normalized => rows
                .into_iter()
                .filter(|row| mode.matches(&row.crop_type, crop_type))
                .collect(),
        })
    }

    pub async fn list_by_farmer(
        db: &DatabaseConnection,
        farmer_id: &str,
    ) -> Result<Vec<FieldBoundaryModel>, sea_orm::DbErr> {
        FieldBoundary::find()
            .filter(field_boundary::Column::FarmerId.eq(farmer_id))
            .order_by_asc(field_boundary::Column::CropType)
            .order_by_asc(field_boundary::Column::CreationDate)
            .all(db)
            .await
    }

    /// 边界表中出现过的 (farmer_id, crop_type) 组合
    pub async fn distinct_pairs(
        db: &DatabaseConnection,
    ) -> Result<Vec<(String, String)>, sea_orm::DbErr> {
        FieldBoundary::find()
            .select_only()
            .column(field_boundary::Column::FarmerId)
            .column(field_boundary::Column::CropType)
            .distinct()
            .order_by_asc(field_boundary::Column::FarmerId)
            .order_by_asc(field_boundary::Column::CropType)
            .into_tuple::<(String, String)>()
            .all(db)
            .await
    }

    pub async fn recent(
        db: &DatabaseConnection,
        limit: u64,
    ) -> Result<Vec<FieldBoundaryModel>, sea_orm::DbErr> {
        FieldBoundary::find()
            .order_by_desc(field_boundary::Column::CreationDate)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
        FieldBoundary::find().count(db).await
    }
}
