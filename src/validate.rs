use crate::linking::metrics::polygon_area_hectares;
use crate::linking::model::{attr_number, attr_text, Coordinate, CropAttributes, FormData};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const UNKNOWN_CROP: &str = "Unknown";

const MAX_QTY_HARVESTED: f64 = 1_000_000.0;
const MAX_PRICE_PER_UNIT: f64 = 10_000.0;
const MAX_AREA: f64 = 10_000.0;
const MAX_FIELD_NAME_LEN: usize = 100;
const MAX_NOTES_LEN: usize = 500;
const MAX_COORDINATES: usize = 1000;

fn farmer_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\-_]+$").expect("farmer id pattern"))
}

fn ea_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").expect("ea code pattern"))
}

fn season_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}/\d{2,4}$").expect("season pattern"))
}

fn field_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\s\-_\.]+$").expect("field name pattern"))
}

fn is_blank(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t == "Select..."
}

/// 一次农户登记提交（导入文件中的 form_responses 条目）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSubmission {
    pub farmer_id: String,
    pub district: String,
    pub village: String,
    #[serde(default)]
    pub ea_code: Option<String>,
    pub season_year: String,
    #[serde(default)]
    pub selected_crops: Vec<String>,
    #[serde(default)]
    pub crop_data: BTreeMap<String, CropAttributes>,
    #[serde(default)]
    pub submission_date: Option<String>,
}

impl FormSubmission {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (value, label) in [
            (&self.farmer_id, "Farmer ID"),
            (&self.district, "District"),
            (&self.village, "Village"),
            (&self.season_year, "Season/Year"),
        ] {
            if is_blank(value) {
                errors.push(format!("{} is required", label));
            }
        }

        if self.selected_crops.is_empty() {
            errors.push("At least one crop must be selected".to_string());
        }

        if !self.farmer_id.is_empty() {
            if self.farmer_id.trim().chars().count() < 3 {
                errors.push("Farmer ID must be at least 3 characters long".to_string());
            }
            if !farmer_id_re().is_match(&self.farmer_id) {
                errors.push(
                    "Farmer ID can only contain letters, numbers, hyphens, and underscores"
                        .to_string(),
                );
            }
        }

        if let Some(ea) = self.ea_code.as_deref().filter(|s| !s.is_empty()) {
            if !ea_code_re().is_match(ea) {
                errors.push("EA Code must contain only numbers".to_string());
            }
        }

        if !self.season_year.is_empty() && !season_year_re().is_match(&self.season_year) {
            errors.push(
                "Season/Year must be in format YYYY/YY or YYYY/YYYY (e.g., 2024/25)".to_string(),
            );
        }

        let empty = CropAttributes::new();
        for crop in &self.selected_crops {
            let attrs = self.crop_data.get(crop).unwrap_or(&empty);
            validate_crop(crop, attrs, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// 存入 form_data 列的 JSON：提交的全部字段 + selected_crops + crop_data
    pub fn form_data(&self) -> FormData {
        let mut extra = Map::new();
        extra.insert("farmer_id".into(), Value::String(self.farmer_id.clone()));
        extra.insert("district".into(), Value::String(self.district.clone()));
        extra.insert("village".into(), Value::String(self.village.clone()));
        extra.insert("season_year".into(), Value::String(self.season_year.clone()));
        extra.insert(
            "ea_code".into(),
            self.ea_code.clone().map(Value::String).unwrap_or(Value::Null),
        );
        FormData {
            selected_crops: self.selected_crops.clone(),
            crop_data: self.crop_data.clone(),
            extra,
        }
    }
}

fn validate_crop(crop: &str, attrs: &CropAttributes, errors: &mut Vec<String>) {
    let placeholder = |key: &str| {
        attrs
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s == "Select...")
            .unwrap_or(false)
    };

    match crop {
        "Coconut" | "Cocoa" | "Breadfruit" => {
            if placeholder("growth_mode") {
                errors.push(format!("Growth mode is required for {}", crop));
            }
        }
        "Banana" => {
            if placeholder("banana_type") {
                errors.push(format!("Banana type is required for {}", crop));
            }
            if placeholder("growth_mode") {
                errors.push(format!("Growth mode is required for {}", crop));
            }
        }
        "Other" => {
            if attr_text(attrs, "other_crop_name").is_none() {
                errors.push(format!("Crop name is required for {}", crop));
            }
        }
        _ => {}
    }

    if let Some(qty) = attr_number(attrs, "qty_harvested") {
        if qty < 0.0 {
            errors.push(format!("Quantity harvested cannot be negative for {}", crop));
        }
        if qty > MAX_QTY_HARVESTED {
            errors.push(format!(
                "Quantity harvested seems unrealistic for {} (max 1,000,000)",
                crop
            ));
        }
        if qty > 0.0 && attr_text(attrs, "unit").is_none() {
            errors.push(format!(
                "Unit is required when quantity harvested is provided for {}",
                crop
            ));
        }
    }

    if let Some(price) = attr_number(attrs, "price_per_unit") {
        if price < 0.0 {
            errors.push(format!("Price per unit cannot be negative for {}", crop));
        }
        if price > MAX_PRICE_PER_UNIT {
            errors.push(format!(
                "Price per unit seems unrealistic for {} (max $10,000)",
                crop
            ));
        }
    }

    if let Some(area) = attr_number(attrs, "area_acres") {
        if area > MAX_AREA {
            errors.push(format!(
                "Area in acres seems unrealistic for {} (max 10,000 acres)",
                crop
            ));
        }
    }
}

/// 一块田地边界（导入文件中的 field_boundaries 条目）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundarySubmission {
    pub farmer_id: String,
    pub field_name: String,
    pub field_type: String,
    #[serde(default)]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub area_estimate: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
}

impl BoundarySubmission {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if is_blank(&self.farmer_id) {
            errors.push("Farmer ID is required".to_string());
        }

        if self.field_name.trim().is_empty() {
            errors.push("Field name is required".to_string());
        } else {
            if self.field_name.chars().count() > MAX_FIELD_NAME_LEN {
                errors.push("Field name must be less than 100 characters".to_string());
            }
            if !field_name_re().is_match(&self.field_name) {
                errors.push("Field name contains invalid characters".to_string());
            }
        }

        if is_blank(&self.field_type) {
            errors.push("Field type is required".to_string());
        }

        if let Err(e) = validate_coordinates(&self.coordinates) {
            errors.push(e);
        }

        if let Some(area) = self.area_estimate.filter(|a| *a != 0.0) {
            if area < 0.0 {
                errors.push("Area estimate must be greater than 0".to_string());
            }
            if area > MAX_AREA {
                errors.push("Area estimate seems unrealistic (max 10,000 acres)".to_string());
            }
        }

        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                errors.push("Notes must be less than 500 characters".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn effective_crop_type(&self) -> String {
        self.crop_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CROP)
            .to_string()
    }

    /// 未提供面积时由多边形估算
    pub fn effective_area(&self) -> Option<f64> {
        match self.area_estimate {
            Some(a) => Some(a),
            None => polygon_area_hectares(&self.coordinates).filter(|a| *a > 0.0),
        }
    }
}

pub fn validate_coordinates(coords: &[Coordinate]) -> Result<(), String> {
    if coords.len() < 3 {
        return Err("Field boundary must have at least 3 points".to_string());
    }
    if coords.len() > MAX_COORDINATES {
        return Err("Too many coordinate points (max 1000)".to_string());
    }
    for c in coords {
        if !c.lat().is_finite() || !c.lon().is_finite() {
            return Err("Coordinates must be valid numbers".to_string());
        }
        if !(-90.0..=90.0).contains(&c.lat()) || !(-180.0..=180.0).contains(&c.lon()) {
            return Err("Coordinates out of valid range".to_string());
        }
    }
    Ok(())
}
