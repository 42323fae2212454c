use crate::linking::model::{BoundaryRecord, Coordinate, CropProduction, SummaryMetrics};

const METERS_PER_DEGREE_LAT: f64 = 111_000.0;
const SQ_METERS_PER_HECTARE: f64 = 10_000.0;

/// 面积合计：只累加非空且大于零的 area_estimate
pub fn total_area(boundaries: &[BoundaryRecord]) -> f64 {
    boundaries
        .iter()
        .filter_map(|b| b.area_estimate)
        .filter(|a| a.is_finite() && *a > 0.0)
        .sum()
}

/// 单位面积产量。产量缺失或面积为零时返回 None，不做除零。
pub fn yield_per_acre(quantity: Option<f64>, area: f64) -> Option<f64> {
    let qty = quantity?;
    if area > 0.0 && qty.is_finite() {
        Some(qty / area)
    } else {
        None
    }
}

pub fn total_value(quantity: Option<f64>, price: Option<f64>) -> Option<f64> {
    Some(quantity? * price?)
}

pub fn summarize(production: Option<&CropProduction>, boundaries: &[BoundaryRecord]) -> SummaryMetrics {
    let area = total_area(boundaries);
    let quantity = production.and_then(|p| p.qty_harvested());
    let price = production.and_then(|p| p.price_per_unit());
    SummaryMetrics {
        total_fields: boundaries.len(),
        total_area: area,
        quantity_harvested: quantity,
        harvest_unit: production.and_then(|p| p.unit()).map(str::to_string),
        yield_per_acre: yield_per_acre(quantity, area),
        price_per_unit: price,
        total_value: total_value(quantity, price),
    }
}

/// 多边形面积估算（公顷）。
///
/// 先用鞋带公式求平方度，再按纬度 1° ≈ 111 km、经度 1° ≈ 111 km × cos(平均纬度) 换算。
/// 少于 3 个点时返回 None。
pub fn polygon_area_hectares(coords: &[Coordinate]) -> Option<f64> {
    let n = coords.len();
    if n < 3 {
        return None;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += coords[i].lon() * coords[j].lat();
        twice_area -= coords[j].lon() * coords[i].lat();
    }
    let sq_degrees = twice_area.abs() / 2.0;

    let lat_avg = coords.iter().map(|c| c.lat()).sum::<f64>() / n as f64;
    let meters_per_degree_lon = METERS_PER_DEGREE_LAT * lat_avg.to_radians().cos();
    let sq_meters = sq_degrees * METERS_PER_DEGREE_LAT * meters_per_degree_lon;

    Some(sq_meters / SQ_METERS_PER_HECTARE)
}
