use crate::config::{normalize_crop, CropMatch};
use crate::error::LinkResult;
use crate::linking::dashboard::{build_dashboard, DashboardData};
use crate::linking::metrics;
use crate::linking::model::{
    BoundaryRecord, CropProduction, DatabaseStats, FarmerOverview, FormData, FormSummary,
    LinkRecord, LinkStatus,
};
use crate::linking::source::LinkSource;
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

/// 产量数据与田地边界的关联服务
pub struct Linker {
    source: Arc<dyn LinkSource>,
}

impl Linker {
    pub fn new(source: Arc<dyn LinkSource>) -> Self {
        Self { source }
    }

    fn pair_key(&self, farmer_id: &str, crop_type: &str) -> (String, String) {
        match self.source.crop_match() {
            CropMatch::Exact => (farmer_id.to_string(), crop_type.to_string()),
            CropMatch::Normalized => (farmer_id.to_string(), normalize_crop(crop_type)),
        }
    }

    /// 从最新的提交往前找，第一份带有该作物 crop_data 的提交即为产量来源；
    /// 农户或作物不存在时返回 None
    pub async fn production_for_crop(
        &self,
        farmer_id: &str,
        crop_type: &str,
    ) -> LinkResult<Option<CropProduction>> {
        for row in self.source.farmer_forms(farmer_id).await? {
            let form = FormData::decode(&row)?;
            if let Some(attrs) = form.attributes_for(crop_type, self.source.crop_match()) {
                return Ok(Some(CropProduction {
                    farmer_id: row.farmer_id.clone(),
                    crop_type: crop_type.to_string(),
                    season_year: row.season_year.clone(),
                    submission_date: row.submission_date.clone(),
                    attributes: attrs.clone(),
                }));
            }
        }
        Ok(None)
    }

    pub async fn boundaries_for_crop(
        &self,
        farmer_id: &str,
        crop_type: &str,
    ) -> LinkResult<Vec<BoundaryRecord>> {
        self.source
            .boundaries(farmer_id, crop_type)
            .await?
            .into_iter()
            .map(BoundaryRecord::try_from)
            .collect()
    }

    pub async fn link_farmer_crop(&self, farmer_id: &str, crop_type: &str) -> LinkResult<LinkRecord> {
        let production = self.production_for_crop(farmer_id, crop_type).await?;
        let boundaries = self.boundaries_for_crop(farmer_id, crop_type).await?;
        let metrics = metrics::summarize(production.as_ref(), &boundaries);
        let status = LinkStatus::classify(production.is_some(), boundaries.len());

        debug!(
            "link {} / {}: {} ({} fields, {:.2} area)",
            farmer_id,
            crop_type,
            status.as_str(),
            metrics.total_fields,
            metrics.total_area
        );

        Ok(LinkRecord {
            status,
            farmer_id: farmer_id.to_string(),
            crop_type: crop_type.to_string(),
            production,
            boundaries,
            metrics,
        })
    }

    /// 表单中出现的 (farmer, crop) 组合，按首次出现顺序去重
    async fn production_pairs(&self) -> LinkResult<Vec<(String, String)>> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        for row in self.source.forms().await? {
            let form = FormData::decode(&row)?;
            for crop in form.selected_crops {
                if seen.insert(self.pair_key(&row.farmer_id, &crop)) {
                    pairs.push((row.farmer_id.clone(), crop));
                }
            }
        }
        Ok(pairs)
    }

    /// 遍历全部表单的全部已选作物，每个 (farmer, crop) 组合输出一条关联记录
    pub async fn build_integrated_dataset(&self) -> LinkResult<Vec<LinkRecord>> {
        let pairs = self.production_pairs().await?;
        let mut out = Vec::with_capacity(pairs.len());
        for (farmer_id, crop_type) in pairs {
            out.push(self.link_farmer_crop(&farmer_id, &crop_type).await?);
        }
        info!("integrated dataset built: {} records", out.len());
        Ok(out)
    }

    /// 表单组合与边界组合的并集，包含只有边界没有产量的组合
    pub async fn all_farmer_crop_links(&self) -> LinkResult<Vec<LinkRecord>> {
        let mut pairs = self.production_pairs().await?;
        let mut seen: HashSet<(String, String)> =
            pairs.iter().map(|(f, c)| self.pair_key(f, c)).collect();
        for (farmer_id, crop_type) in self.source.boundary_pairs().await? {
            if seen.insert(self.pair_key(&farmer_id, &crop_type)) {
                pairs.push((farmer_id, crop_type));
            }
        }

        let mut out = Vec::with_capacity(pairs.len());
        for (farmer_id, crop_type) in pairs {
            out.push(self.link_farmer_crop(&farmer_id, &crop_type).await?);
        }
        Ok(out)
    }

    pub async fn dashboard(&self) -> LinkResult<DashboardData> {
        let records = self.all_farmer_crop_links().await?;
        Ok(build_dashboard(records))
    }

    pub async fn database_stats(&self) -> LinkResult<DatabaseStats> {
        let (form_responses, field_boundaries) = self.source.table_counts().await?;
        Ok(DatabaseStats {
            form_responses,
            field_boundaries,
            total_records: form_responses + field_boundaries,
        })
    }

    pub async fn farmer_overview(&self, farmer_id: &str) -> LinkResult<FarmerOverview> {
        let mut forms = Vec::new();
        for row in self.source.farmer_forms(farmer_id).await? {
            let data = FormData::decode(&row)?;
            let crops_missing_data = data
                .crops_missing_data()
                .into_iter()
                .map(str::to_string)
                .collect();
            forms.push(FormSummary {
                id: row.id,
                district: row.district,
                village: row.village,
                season_year: row.season_year,
                submission_date: row.submission_date,
                selected_crops: data.selected_crops,
                crops_missing_data,
            });
        }

        let boundaries = self
            .source
            .farmer_boundaries(farmer_id)
            .await?
            .into_iter()
            .map(BoundaryRecord::try_from)
            .collect::<LinkResult<Vec<_>>>()?;

        Ok(FarmerOverview {
            farmer_id: farmer_id.to_string(),
            forms,
            boundaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::storage::entity::form_response;
    use crate::storage::repository::{FieldBoundaryRepository, FormResponseRepository};
    use crate::test_support::{
        boundary_submission, form_submission, insert_raw_boundary, linker, seed_report_sample,
        test_db,
    };
    use pretty_assertions::assert_eq;
    use sea_orm::{ActiveModelTrait, NotSet, Set};
    use serde_json::json;

    #[tokio::test]
    async fn report_sample_links() {
        let db = test_db().await;
        seed_report_sample(&db).await;
        let linker = linker(&db, CropMatch::Exact);

        let coconut = linker
            .link_farmer_crop("EA10208-HH0012", "Coconut")
            .await
            .unwrap();
        assert_eq!(coconut.status, LinkStatus::Linked);
        assert_eq!(coconut.boundary_count(), 1);

        let cocoa = linker
            .link_farmer_crop("EA10208-HH0012", "Cocoa")
            .await
            .unwrap();
        assert_eq!(cocoa.boundary_count(), 1);
        assert_eq!(cocoa.metrics.quantity_harvested, Some(40.0));

        let other = linker
            .link_farmer_crop("EA10208-HH0014", "Other")
            .await
            .unwrap();
        assert!(other.production.is_none());
        assert_eq!(other.status, LinkStatus::BoundariesOnly);
    }

    #[tokio::test]
    async fn yield_uses_non_null_area_only() {
        let db = test_db().await;
        seed_report_sample(&db).await;
        let linker = linker(&db, CropMatch::Exact);

        // HH0012/Coconut: 一块 2.0 面积的田，产量 120
        let rec = linker
            .link_farmer_crop("EA10208-HH0012", "Coconut")
            .await
            .unwrap();
        assert_eq!(rec.metrics.total_area, 2.0);
        assert_eq!(rec.metrics.yield_per_acre, Some(60.0));
        assert_eq!(rec.metrics.harvest_unit.as_deref(), Some("Each"));

        // HH0013/Kava: 两块田面积都为空
        let kava = linker
            .link_farmer_crop("EA10208-HH0013", "Kava")
            .await
            .unwrap();
        assert_eq!(kava.boundary_count(), 2);
        assert_eq!(kava.metrics.total_area, 0.0);
        assert_eq!(kava.metrics.yield_per_acre, None);
    }

    #[tokio::test]
    async fn absent_farmer_or_crop_is_not_an_error() {
        let db = test_db().await;
        seed_report_sample(&db).await;
        let linker = linker(&db, CropMatch::Exact);

        assert!(linker
            .production_for_crop("nobody", "Coconut")
            .await
            .unwrap()
            .is_none());
        assert!(linker
            .production_for_crop("EA10208-HH0012", "Breadfruit")
            .await
            .unwrap()
            .is_none());
        // 有边界但作物不匹配
        assert!(linker
            .boundaries_for_crop("EA10208-HH0014", "Coconut")
            .await
            .unwrap()
            .is_empty());

        let rec = linker.link_farmer_crop("nobody", "Coconut").await.unwrap();
        assert_eq!(rec.status, LinkStatus::NoData);
    }

    #[tokio::test]
    async fn dataset_has_one_record_per_selected_crop() {
        let db = test_db().await;
        seed_report_sample(&db).await;
        let linker = linker(&db, CropMatch::Exact);

        let dataset = linker.build_integrated_dataset().await.unwrap();
        let keys: Vec<(String, String)> = dataset
            .iter()
            .map(|r| (r.farmer_id.clone(), r.crop_type.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("EA10208-HH0012".to_string(), "Coconut".to_string()),
                ("EA10208-HH0012".to_string(), "Cocoa".to_string()),
                ("EA10208-HH0013".to_string(), "Kava".to_string()),
            ]
        );
        for rec in dataset.iter().filter(|r| r.farmer_id == "EA10208-HH0012") {
            assert!(rec.boundary_count() > 0);
        }
    }

    #[tokio::test]
    async fn dashboard_includes_boundary_only_pairs() {
        let db = test_db().await;
        seed_report_sample(&db).await;
        let linker = linker(&db, CropMatch::Exact);

        let dash = linker.dashboard().await.unwrap();
        assert_eq!(dash.summary.total_combinations, 4);
        assert_eq!(dash.summary.fully_linked, 3);
        assert_eq!(dash.summary.boundaries_only, 1);
        assert_eq!(dash.summary.total_boundary_records, 5);
        assert_eq!(dash.crop_analysis["Coconut"].farmers, 1);

        let stats = linker.database_stats().await.unwrap();
        assert_eq!(stats.form_responses, 2);
        assert_eq!(stats.field_boundaries, 5);
        assert_eq!(stats.total_records, 7);
    }

    #[tokio::test]
    async fn normalized_matching_links_case_variants() {
        let db = test_db().await;
        seed_report_sample(&db).await;

        let exact = linker(&db, CropMatch::Exact);
        assert!(exact
            .boundaries_for_crop("EA10208-HH0012", "coconut")
            .await
            .unwrap()
            .is_empty());

        let loose = linker(&db, CropMatch::Normalized);
        let rec = loose
            .link_farmer_crop("EA10208-HH0012", " coconut")
            .await
            .unwrap();
        assert_eq!(rec.status, LinkStatus::Linked);
        assert_eq!(rec.boundary_count(), 1);
    }

    #[tokio::test]
    async fn malformed_form_data_surfaces() {
        let db = test_db().await;
        seed_report_sample(&db).await;
        form_response::ActiveModel {
            id: NotSet,
            farmer_id: Set("BROKEN-1".to_string()),
            district: Set("Aana".to_string()),
            village: Set("Leulumoega".to_string()),
            ea_code: Set(None),
            season_year: Set("2024/25".to_string()),
            crop_type: Set("Kava".to_string()),
            form_data: Set("{not json".to_string()),
            submission_date: Set("2025-02-01T00:00:00".to_string()),
        }
        .insert(&db)
        .await
        .unwrap();
        let linker = linker(&db, CropMatch::Exact);

        let err = linker
            .production_for_crop("BROKEN-1", "Kava")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::MalformedFormData { .. }));
        assert!(matches!(
            linker.build_integrated_dataset().await,
            Err(LinkError::MalformedFormData { .. })
        ));
    }

    #[tokio::test]
    async fn farmer_overview_lists_everything() {
        let db = test_db().await;
        seed_report_sample(&db).await;
        let linker = linker(&db, CropMatch::Exact);

        let ov = linker.farmer_overview("EA10208-HH0012").await.unwrap();
        assert_eq!(ov.forms.len(), 1);
        assert_eq!(ov.forms[0].selected_crops, vec!["Coconut", "Cocoa"]);
        assert_eq!(ov.boundaries.len(), 2);

        let none = linker.farmer_overview("nobody").await.unwrap();
        assert!(none.forms.is_empty() && none.boundaries.is_empty());
    }

    #[tokio::test]
    async fn normalized_matching_agrees_on_whitespace_and_unicode() {
        let db = test_db().await;
        FormResponseRepository::insert(&db, &form_submission("F-001", &["Coconut", "Ta'amū"]))
            .await
            .unwrap();
        insert_raw_boundary(&db, "F-001", "Coconut\t", "Upper plot").await;
        insert_raw_boundary(&db, "F-001", "TA'AMŪ", "Lower plot").await;
        let loose = linker(&db, CropMatch::Normalized);

        let dash = loose.dashboard().await.unwrap();
        assert_eq!(dash.summary.total_combinations, 2);
        assert_eq!(dash.summary.fully_linked, 2);
        assert_eq!(dash.summary.total_boundary_records, 2);

        assert_eq!(
            loose.boundaries_for_crop("F-001", "TA'AMŪ").await.unwrap().len(),
            1
        );
        assert_eq!(
            loose.boundaries_for_crop("F-001", "Coconut").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn crop_from_older_submission_keeps_its_production() {
        let db = test_db().await;
        let mut older = form_submission("F-001", &["Taro"]);
        older.season_year = "2023/24".to_string();
        older.submission_date = Some("2024-03-01T00:00:00".to_string());
        let mut newer = form_submission("F-001", &["Coconut"]);
        newer.submission_date = Some("2025-03-01T00:00:00".to_string());
        FormResponseRepository::insert(&db, &older).await.unwrap();
        FormResponseRepository::insert(&db, &newer).await.unwrap();
        FieldBoundaryRepository::insert(&db, &boundary_submission("F-001", "Taro", Some(1.0)))
            .await
            .unwrap();
        let linker = linker(&db, CropMatch::Exact);

        let dataset = linker.build_integrated_dataset().await.unwrap();
        assert_eq!(dataset.len(), 2);
        let taro = dataset.iter().find(|r| r.crop_type == "Taro").unwrap();
        assert_eq!(taro.status, LinkStatus::Linked);
        assert_eq!(taro.production.as_ref().unwrap().season_year, "2023/24");
        assert_eq!(taro.metrics.quantity_harvested, Some(10.0));

        // 两份提交都有该作物时，仍取最新的一份
        let mut latest = form_submission("F-001", &["Taro"]);
        latest.crop_data.insert(
            "Taro".to_string(),
            json!({"qty_harvested": 99, "unit": "Kg"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        latest.submission_date = Some("2025-06-01T00:00:00".to_string());
        FormResponseRepository::insert(&db, &latest).await.unwrap();

        let prod = linker
            .production_for_crop("F-001", "Taro")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prod.qty_harvested(), Some(99.0));
        assert_eq!(prod.submission_date, "2025-06-01T00:00:00");
    }
}
