use crate::error::LinkError;
use crate::storage::repository::now_iso;
use crate::storage::entity::form_response::{
    self, ActiveModel as FormResponseActiveModel, Entity as FormResponse,
    Model as FormResponseModel,
};
use crate::validate::FormSubmission;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

pub struct FormResponseRepository;

impl FormResponseRepository {
    /// 写入一条已校验的提交，crop_type 列由 selected_crops 生成
    pub async fn insert(
        db: &DatabaseConnection,
        submission: &FormSubmission,
    ) -> Result<i32, LinkError> {
        let form_data = submission.form_data();
        let encoded = form_data
            .encode()
            .map_err(|e| LinkError::Validation(vec![format!("form_data encode: {}", e)]))?;

        let am = FormResponseActiveModel {
            id: NotSet,
            farmer_id: Set(submission.farmer_id.trim().to_string()),
            district: Set(submission.district.clone()),
            village: Set(submission.village.clone()),
            ea_code: Set(submission.ea_code.clone().filter(|s| !s.is_empty())),
            season_year: Set(submission.season_year.clone()),
            crop_type: Set(form_data.crop_type_display()),
            form_data: Set(encoded),
            submission_date: Set(submission.submission_date.clone().unwrap_or_else(now_iso)),
        };
        let model = am.insert(db).await?;
        Ok(model.id)
    }

    pub async fn list_all(
        db: &DatabaseConnection,
    ) -> Result<Vec<FormResponseModel>, sea_orm::DbErr> {
        FormResponse::find()
            .order_by_asc(form_response::Column::Id)
            .all(db)
            .await
    }

    /// 农户的全部提交，最新的在前（submission_date 降序，其次 id 降序）
    pub async fn list_by_farmer(
        db: &DatabaseConnection,
        farmer_id: &str,
    ) -> Result<Vec<FormResponseModel>, sea_orm::DbErr> {
        FormResponse::find()
            .filter(form_response::Column::FarmerId.eq(farmer_id))
            .order_by_desc(form_response::Column::SubmissionDate)
            .order_by_desc(form_response::Column::Id)
            .all(db)
            .await
    }

    pub async fn recent(
        db: &DatabaseConnection,
        limit: u64,
    ) -> Result<Vec<FormResponseModel>, sea_orm::DbErr> {
        FormResponse::find()
            .order_by_desc(form_response::Column::SubmissionDate)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn distinct_farmers(db: &DatabaseConnection) -> Result<Vec<String>, sea_orm::DbErr> {
        FormResponse::find()
            .select_only()
            .column(form_response::Column::FarmerId)
            .distinct()
            .order_by_asc(form_response::Column::FarmerId)
            .into_tuple::<String>()
            .all(db)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
        FormResponse::find().count(db).await
    }
}
