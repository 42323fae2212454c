use crate::linking::model::{LinkRecord, LinkStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_combinations: usize,
    pub fully_linked: usize,
    pub production_only: usize,
    pub boundaries_only: usize,
    pub no_data: usize,
    pub total_production_records: usize,
    pub total_boundary_records: usize,
    pub linking_success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CropAnalysis {
    pub farmers: usize,
    pub fields: usize,
    pub total_area: f64,
    pub total_production: f64,
    pub total_value: f64,
    pub average_yield: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardData {
    pub summary: DashboardSummary,
    pub crop_analysis: BTreeMap<String, CropAnalysis>,
    pub records: Vec<LinkRecord>,
}

pub fn build_dashboard(records: Vec<LinkRecord>) -> DashboardData {
    let mut summary = DashboardSummary {
        total_combinations: records.len(),
        ..Default::default()
    };

    for r in &records {
        match r.status {
            LinkStatus::Linked => summary.fully_linked += 1,
            LinkStatus::ProductionOnly => summary.production_only += 1,
            LinkStatus::BoundariesOnly => summary.boundaries_only += 1,
            LinkStatus::NoData => summary.no_data += 1,
        }
        if r.production.is_some() {
            summary.total_production_records += 1;
        }
        summary.total_boundary_records += r.boundary_count();
    }
    summary.linking_success_rate = if records.is_empty() {
        0.0
    } else {
        summary.fully_linked as f64 / records.len() as f64
    };

    // 作物维度只统计完全关联的组合
    let mut farmers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut crop_analysis: BTreeMap<String, CropAnalysis> = BTreeMap::new();
    for r in records.iter().filter(|r| r.status == LinkStatus::Linked) {
        farmers
            .entry(r.crop_type.clone())
            .or_default()
            .insert(r.farmer_id.clone());
        let entry = crop_analysis.entry(r.crop_type.clone()).or_default();
        entry.fields += r.metrics.total_fields;
        entry.total_area += r.metrics.total_area;
        entry.total_production += r.metrics.quantity_harvested.unwrap_or(0.0);
        entry.total_value += r.metrics.total_value.unwrap_or(0.0);
    }
    for (crop, entry) in crop_analysis.iter_mut() {
        entry.farmers = farmers.get(crop).map(|s| s.len()).unwrap_or(0);
        entry.average_yield = if entry.total_area > 0.0 {
            Some(entry.total_production / entry.total_area)
        } else {
            None
        };
    }

    DashboardData {
        summary,
        crop_analysis,
        records,
    }
}
