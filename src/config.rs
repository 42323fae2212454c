use log::warn;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://agricultural_data.db?mode=rwc";
const DEFAULT_REFRESH_SECS: u64 = 5;

/// 作物名称匹配方式。默认精确匹配，`normalized` 会忽略首尾空白和大小写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMatch {
    #[default]
    Exact,
    Normalized,
}

impl CropMatch {
    pub fn matches(&self, a: &str, b: &str) -> bool {
        match self {
            CropMatch::Exact => a == b,
            CropMatch::Normalized => normalize_crop(a) == normalize_crop(b),
        }
    }
}

impl FromStr for CropMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(CropMatch::Exact),
            "normalized" | "normalised" | "loose" => Ok(CropMatch::Normalized),
            other => Err(format!("unknown crop match mode: {}", other)),
        }
    }
}

pub fn normalize_crop(s: &str) -> String {
    s.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub crop_match: CropMatch,
    pub refresh_secs: u64,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            crop_match: CropMatch::Exact,
            refresh_secs: DEFAULT_REFRESH_SECS,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// 从环境变量读取配置（调用前应已加载 .env）
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(url) = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
            cfg.database_url = url.trim().to_string();
        }

        if let Some(raw) = lookup("FIELDLINK_CROP_MATCH") {
            match raw.parse::<CropMatch>() {
                Ok(m) => cfg.crop_match = m,
                Err(e) => warn!("{}，使用默认的精确匹配", e),
            }
        }

        if let Some(raw) = lookup("FIELDLINK_REFRESH_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => cfg.refresh_secs = v,
                _ => warn!(
                    "FIELDLINK_REFRESH_SECS 无效: {}，使用默认值 {}",
                    raw, DEFAULT_REFRESH_SECS
                ),
            }
        }

        if let Some(dir) = lookup("FIELDLINK_LOG_DIR").filter(|s| !s.trim().is_empty()) {
            cfg.log_dir = PathBuf::from(dir.trim());
        }

        cfg
    }

    pub fn is_memory_db(&self) -> bool {
        is_memory_url(&self.database_url)
    }
}

pub fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = AppConfig::from_lookup(|_| None);
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.crop_match, CropMatch::Exact);
        assert_eq!(cfg.refresh_secs, 5);
        assert_eq!(cfg.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("FIELDLINK_CROP_MATCH", "Normalized"),
            ("FIELDLINK_REFRESH_SECS", "30"),
            ("FIELDLINK_LOG_DIR", "/tmp/fl"),
        ]));
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert!(cfg.is_memory_db());
        assert_eq!(cfg.crop_match, CropMatch::Normalized);
        assert_eq!(cfg.refresh_secs, 30);
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/fl"));
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("FIELDLINK_CROP_MATCH", "fuzzy"),
            ("FIELDLINK_REFRESH_SECS", "0"),
        ]));
        assert_eq!(cfg.crop_match, CropMatch::Exact);
        assert_eq!(cfg.refresh_secs, 5);
    }

    #[test]
    fn crop_match_modes() {
        assert!(CropMatch::Exact.matches("Coconut", "Coconut"));
        assert!(!CropMatch::Exact.matches("Coconut", "coconut "));
        assert!(CropMatch::Normalized.matches("Coconut", " coconut "));
        assert!(!CropMatch::Normalized.matches("Coconut", "Cocoa"));
    }
}
