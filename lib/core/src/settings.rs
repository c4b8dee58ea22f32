//! Index-level settings and version handling
//!
//! Settings are a flat string map, the same shape index settings take on the
//! wire (`index.version.created`, `index.mapping.coerce`, ...). Typed getters
//! parse values on demand; nothing here is mutable once handed to a context.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const INDEX_VERSION_CREATED: &str = "index.version.created";
pub const INDEX_MAPPING_IGNORE_MALFORMED: &str = "index.mapping.ignore_malformed";
pub const INDEX_MAPPING_COERCE: &str = "index.mapping.coerce";
pub const ALLOW_EXPENSIVE_QUERIES: &str = "index.mapping.allow_expensive_queries";

/// Index format version, ordered by release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const V_6_8_0: Version = Version::new(6, 8, 0);
    pub const V_7_0_0: Version = Version::new(7, 0, 0);
    pub const V_7_5_0: Version = Version::new(7, 5, 0);
    pub const V_8_0_0: Version = Version::new(8, 0, 0);
    pub const CURRENT: Version = Version::new(7, 8, 0);

    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }

    pub fn before(&self, other: Version) -> bool {
        *self < other
    }

    pub fn on_or_after(&self, other: Version) -> bool {
        *self >= other
    }

    /// Version the index was created with; `CURRENT` when the setting is absent
    pub fn index_created(settings: &IndexSettings) -> Result<Version> {
        match settings.get(INDEX_VERSION_CREATED) {
            Some(raw) => raw.parse(),
            None => Ok(Version::CURRENT),
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::CURRENT
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(Error::InvalidArgument(format!("illegal version format [{}]", s)));
        }
        let mut nums = [0u8; 3];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("illegal version format [{}]", s)))?;
        }
        Ok(Version::new(nums[0], nums[1], nums[2]))
    }
}

/// Read-only index settings shared by every context of one mapping build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexSettings {
    values: BTreeMap<String, String>,
}

impl IndexSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> IndexSettingsBuilder {
        IndexSettingsBuilder::default()
    }

    /// Load settings from a JSON object of string (or scalar) values
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("index settings must be an object".to_string()))?;
        let mut values = BTreeMap::new();
        for (key, v) in obj {
            let raw = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => v.to_string(),
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "setting [{}] must be a scalar, got [{}]",
                        key, other
                    )))
                }
            };
            values.insert(key.clone(), raw);
        }
        Ok(Self { values })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_json(&value)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(Error::InvalidArgument(format!(
                "Failed to parse value [{}] as only [true] or [false] are allowed for setting [{}]",
                other, key
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct IndexSettingsBuilder {
    values: BTreeMap<String, String>,
}

impl IndexSettingsBuilder {
    pub fn put(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn version_created(self, version: Version) -> Self {
        self.put(INDEX_VERSION_CREATED, version)
    }

    pub fn build(self) -> IndexSettings {
        IndexSettings { values: self.values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_ordering() {
        assert!(Version::V_7_0_0.before(Version::V_7_5_0));
        assert!(Version::CURRENT.on_or_after(Version::V_7_5_0));
        assert_eq!("7.4.2".parse::<Version>().unwrap(), Version::new(7, 4, 2));
        assert_eq!("7".parse::<Version>().unwrap(), Version::new(7, 0, 0));
        assert!("seven".parse::<Version>().is_err());
    }

    #[test]
    fn test_index_created_defaults_to_current() {
        let settings = IndexSettings::new();
        assert_eq!(Version::index_created(&settings).unwrap(), Version::CURRENT);

        let settings = IndexSettings::builder().version_created(Version::V_6_8_0).build();
        assert_eq!(Version::index_created(&settings).unwrap(), Version::V_6_8_0);
    }

    #[test]
    fn test_bool_settings() {
        let settings = IndexSettings::from_json(&json!({
            "index.mapping.coerce": true,
            "index.mapping.ignore_malformed": "yes"
        }))
        .unwrap();
        assert!(settings.get_bool(INDEX_MAPPING_COERCE, false).unwrap());
        assert!(settings.get_bool(INDEX_MAPPING_IGNORE_MALFORMED, false).is_err());
        assert!(!settings.get_bool("index.unset", false).unwrap());
    }

    #[test]
    fn test_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"index.version.created": "7.4.0"}"#).unwrap();

        let settings = IndexSettings::from_file(&path).unwrap();
        assert_eq!(Version::index_created(&settings).unwrap(), Version::new(7, 4, 0));
    }
}
