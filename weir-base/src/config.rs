use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use weir::StdError;

/// Application configuration split into named JSON sections.
///
/// # Examples
///
/// ```rust
/// use weir_base::Config;
///
/// let mut config = Config::parse(r#"{"http_server": {"addr": "127.0.0.1:8080"}}"#).unwrap();
/// config.merge_from(Config::parse(r#"{"http_server": {"addr": "0.0.0.0:80"}}"#).unwrap());
///
/// let section: serde_json::Value = config.get("http_server").unwrap();
/// assert_eq!(section["addr"], "0.0.0.0:80");
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    sections: BTreeMap<String, serde_json::Value>,
}

/// A typed configuration section stored under a fixed key.
pub trait ConfigSection: DeserializeOwned {
    fn key() -> &'static str;
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserializes section `name`. A missing section reads as `null`.
    pub fn get<T>(&self, name: impl AsRef<str>) -> Result<T, StdError>
    where
        T: DeserializeOwned,
    {
        let value = self
            .sections
            .get(name.as_ref())
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Deserializes the section of `T`, or returns `None` when it is absent.
    pub fn section<T>(&self) -> Result<Option<T>, StdError>
    where
        T: ConfigSection,
    {
        self.get::<Option<T>>(T::key())
    }

    pub fn set<T>(&mut self, name: impl Into<String>, value: T) -> Result<&mut Self, StdError>
    where
        T: Serialize,
    {
        self.sections
            .insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Builder variant of [`set`](Config::set).
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be serialized to JSON.
    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Serialize,
    {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(err) => panic!("Cannot serialize config section: {err}"),
        };
        self.sections.insert(name.into(), value);
        self
    }

    /// Deep merges `other` into this config.
    ///
    /// Objects are merged key by key, arrays are extended and every other value
    /// is replaced.
    pub fn merge_from(&mut self, other: Self) -> &mut Self {
        for (key, value) in other.sections {
            let entry = self.sections.entry(key);
            merge_json_from(entry.or_insert(serde_json::Value::Null), value);
        }
        self
    }

    pub fn parse<T>(text: T) -> Result<Self, StdError>
    where
        T: AsRef<str>,
    {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub async fn parse_file(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(text)?;
        tracing::debug!(path = %path.display(), sections = config.len(), "Config loaded");
        Ok(config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }
}

fn merge_json_from(lhs: &mut serde_json::Value, rhs: serde_json::Value) {
    match (lhs, rhs) {
        (serde_json::Value::Object(l), serde_json::Value::Object(r)) => {
            for (key, value) in r {
                merge_json_from(l.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (serde_json::Value::Array(l), serde_json::Value::Array(r)) => l.extend(r),
        (lhs, rhs) => *lhs = rhs,
    }
}
