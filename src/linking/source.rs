use crate::config::CropMatch;
use crate::error::LinkResult;
use crate::storage::entity::{field_boundary, form_response};
use crate::storage::repository::{FieldBoundaryRepository, FormResponseRepository};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// 关联层读取两张表的入口。每次调用都是独立的只读查询。
#[async_trait]
pub trait LinkSource: Send + Sync {
    fn crop_match(&self) -> CropMatch;

    async fn forms(&self) -> LinkResult<Vec<form_response::Model>>;

    /// 农户的全部提交，最新的在前
    async fn farmer_forms(&self, farmer_id: &str) -> LinkResult<Vec<form_response::Model>>;

    async fn boundaries(
        &self,
        farmer_id: &str,
        crop_type: &str,
    ) -> LinkResult<Vec<field_boundary::Model>>;

    async fn farmer_boundaries(&self, farmer_id: &str) -> LinkResult<Vec<field_boundary::Model>>;

    async fn boundary_pairs(&self) -> LinkResult<Vec<(String, String)>>;

    async fn table_counts(&self) -> LinkResult<(u64, u64)>;
}

pub struct SqliteLinkSource {
    db: Arc<DatabaseConnection>,
    crop_match: CropMatch,
}

impl SqliteLinkSource {
    pub fn new(db: Arc<DatabaseConnection>, crop_match: CropMatch) -> Self {
        Self { db, crop_match }
    }
}

#[async_trait]
impl LinkSource for SqliteLinkSource {
    fn crop_match(&self) -> CropMatch {
        self.crop_match
    }

    async fn forms(&self) -> LinkResult<Vec<form_response::Model>> {
        Ok(FormResponseRepository::list_all(&self.db).await?)
    }

    async fn farmer_forms(&self, farmer_id: &str) -> LinkResult<Vec<form_response::Model>> {
        Ok(FormResponseRepository::list_by_farmer(&self.db, farmer_id).await?)
    }

    async fn boundaries(
        &self,
        farmer_id: &str,
        crop_type: &str,
    ) -> LinkResult<Vec<field_boundary::Model>> {
        Ok(
            FieldBoundaryRepository::find_for_crop(&self.db, farmer_id, crop_type, self.crop_match)
                .await?,
        )
    }

    async fn farmer_boundaries(&self, farmer_id: &str) -> LinkResult<Vec<field_boundary::Model>> {
        Ok(FieldBoundaryRepository::list_by_farmer(&self.db, farmer_id).await?)
    }

    async fn boundary_pairs(&self) -> LinkResult<Vec<(String, String)>> {
        Ok(FieldBoundaryRepository::distinct_pairs(&self.db).await?)
    }

    async fn table_counts(&self) -> LinkResult<(u64, u64)> {
        let forms = FormResponseRepository::count(&self.db).await?;
        let boundaries = FieldBoundaryRepository::count(&self.db).await?;
        Ok((forms, boundaries))
    }
}
