use crate::config::CropMatch;
use crate::error::{LinkError, LinkResult};
use crate::storage::entity::{field_boundary, form_response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 单个作物的属性包（产量、单位、种植方式等），结构不固定
pub type CropAttributes = Map<String, Value>;

/// form_responses.form_data 列的 JSON 结构。
///
/// `selected_crops` 是作物列表的唯一事实来源；表中的 `crop_type` 列只是它的展示形式。
/// 其余顶层键（farmer_id、district 等提交时一并写入的字段）原样保存在 `extra` 中。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormData {
    #[serde(default)]
    pub selected_crops: Vec<String>,
    #[serde(default)]
    pub crop_data: BTreeMap<String, CropAttributes>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormData {
    pub fn decode(row: &form_response::Model) -> LinkResult<Self> {
        serde_json::from_str(&row.form_data).map_err(|source| LinkError::MalformedFormData {
            row_id: row.id,
            farmer_id: row.farmer_id.clone(),
            source,
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 表中 crop_type 列的展示字符串
    pub fn crop_type_display(&self) -> String {
        if self.selected_crops.is_empty() {
            "None".to_string()
        } else {
            self.selected_crops.join(", ")
        }
    }

    pub fn attributes_for(&self, crop_type: &str, mode: CropMatch) -> Option<&CropAttributes> {
        if let Some(attrs) = self.crop_data.get(crop_type) {
            return Some(attrs);
        }
        match mode {
            CropMatch::Exact => None,
            CropMatch::Normalized => self
                .crop_data
                .iter()
                .find(|(k, _)| mode.matches(k, crop_type))
                .map(|(_, v)| v),
        }
    }

    /// selected_crops 中没有对应 crop_data 键的作物
    pub fn crops_missing_data(&self) -> Vec<&str> {
        self.selected_crops
            .iter()
            .filter(|c| !self.crop_data.contains_key(c.as_str()))
            .map(|c| c.as_str())
            .collect()
    }
}

pub fn attr_number(attrs: &CropAttributes, key: &str) -> Option<f64> {
    match attrs.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn attr_text<'a>(attrs: &'a CropAttributes, key: &str) -> Option<&'a str> {
    attrs
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "Select...")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProduction {
    pub farmer_id: String,
    pub crop_type: String,
    pub season_year: String,
    pub submission_date: String,
    pub attributes: CropAttributes,
}

impl CropProduction {
    pub fn qty_harvested(&self) -> Option<f64> {
        attr_number(&self.attributes, "qty_harvested")
    }

    pub fn unit(&self) -> Option<&str> {
        attr_text(&self.attributes, "unit")
    }

    pub fn price_per_unit(&self) -> Option<f64> {
        attr_number(&self.attributes, "price_per_unit")
    }
}

/// 经纬度点，序列化为 `[lat, lon]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate(pub f64, pub f64);

impl Coordinate {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }
}

pub fn decode_coordinates(row_id: i32, raw: &str) -> LinkResult<Vec<Coordinate>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|source| LinkError::MalformedCoordinates { row_id, source })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    pub id: i32,
    pub farmer_id: String,
    pub field_name: String,
    pub field_type: String,
    pub crop_type: String,
    pub coordinates: Vec<Coordinate>,
    pub area_estimate: Option<f64>,
    pub notes: Option<String>,
    pub creation_date: String,
}

impl TryFrom<field_boundary::Model> for BoundaryRecord {
    type Error = LinkError;

    fn try_from(model: field_boundary::Model) -> Result<Self, Self::Error> {
        let coordinates = decode_coordinates(model.id, &model.coordinates)?;
        Ok(Self {
            id: model.id,
            farmer_id: model.farmer_id,
            field_name: model.field_name,
            field_type: model.field_type,
            crop_type: model.crop_type,
            coordinates,
            area_estimate: model.area_estimate,
            notes: model.notes,
            creation_date: model.creation_date,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Linked,
    ProductionOnly,
    BoundariesOnly,
    NoData,
}

impl LinkStatus {
    pub fn classify(has_production: bool, boundary_count: usize) -> Self {
        match (has_production, boundary_count > 0) {
            (true, true) => LinkStatus::Linked,
            (true, false) => LinkStatus::ProductionOnly,
            (false, true) => LinkStatus::BoundariesOnly,
            (false, false) => LinkStatus::NoData,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Linked => "LINKED",
            LinkStatus::ProductionOnly => "PRODUCTION_ONLY",
            LinkStatus::BoundariesOnly => "BOUNDARIES_ONLY",
            LinkStatus::NoData => "NO_DATA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_fields: usize,
    pub total_area: f64,
    pub quantity_harvested: Option<f64>,
    pub harvest_unit: Option<String>,
    pub yield_per_acre: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub total_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub status: LinkStatus,
    pub farmer_id: String,
    pub crop_type: String,
    pub production: Option<CropProduction>,
    pub boundaries: Vec<BoundaryRecord>,
    pub metrics: SummaryMetrics,
}

impl LinkRecord {
    pub fn boundary_count(&self) -> usize {
        self.boundaries.len()
    }
}

/// 单条表单的概要（农户总览用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: i32,
    pub district: String,
    pub village: String,
    pub season_year: String,
    pub submission_date: String,
    pub selected_crops: Vec<String>,
    pub crops_missing_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FarmerOverview {
    pub farmer_id: String,
    pub forms: Vec<FormSummary>,
    pub boundaries: Vec<BoundaryRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub form_responses: u64,
    pub field_boundaries: u64,
    pub total_records: u64,
}
