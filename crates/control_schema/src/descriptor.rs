use std::{collections::HashMap, fmt};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Widget kind of a control. Only `select` and `slider` change how values
/// are validated; every other kind is display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ControlKind {
    #[default]
    Input,
    Select,
    Slider,
    Toggle,
    Other(String),
}

impl From<String> for ControlKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "input" => Self::Input,
            "select" => Self::Select,
            "slider" => Self::Slider,
            "toggle" => Self::Toggle,
            _ => Self::Other(value),
        }
    }
}

impl From<ControlKind> for String {
    fn from(value: ControlKind) -> Self {
        match value {
            ControlKind::Input => "input".into(),
            ControlKind::Select => "select".into(),
            ControlKind::Slider => "slider".into(),
            ControlKind::Toggle => "toggle".into(),
            ControlKind::Other(kind) => kind,
        }
    }
}

/// Declared type of the value a control stores. Unrecognized tags fall
/// back to `Str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    #[default]
    Str,
}

impl From<String> for ValueType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "float" => Self::Float,
            _ => Self::Str,
        }
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        };
        f.write_str(tag)
    }
}

/// Unit conversion applied after normalization. Unknown tags are kept so the
/// catalog round-trips, and behave as the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Conversion {
    FahrenheitToCelsius,
    MphToKph,
    Other(String),
}

impl From<String> for Conversion {
    fn from(value: String) -> Self {
        match value.as_str() {
            "f_to_c" => Self::FahrenheitToCelsius,
            "mph_to_kph" => Self::MphToKph,
            _ => Self::Other(value),
        }
    }
}

impl From<Conversion> for String {
    fn from(value: Conversion) -> Self {
        match value {
            Conversion::FahrenheitToCelsius => "f_to_c".into(),
            Conversion::MphToKph => "mph_to_kph".into(),
            Conversion::Other(tag) => tag,
        }
    }
}

/// Display metadata and tags are decoded leniently: a value of the wrong
/// JSON type reads as absent. `path`, `values`, `min`, `max`, `step` and
/// `maps_to` drive validation and must decode, or the entry is skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlDescriptor {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: ControlKind,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_to: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub conversion: Option<Conversion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Keys the engine does not know about, re-emitted untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ControlDescriptor {
    pub fn value_type(&self) -> ValueType {
        self.value_type.unwrap_or_default()
    }

    /// Non-empty `maps_to`, if the control is aliased.
    pub fn maps_to(&self) -> Option<&str> {
        self.maps_to.as_deref().filter(|target| !target.is_empty())
    }

    /// Where normalized values for this control are written.
    pub fn target_path(&self) -> Option<&str> {
        self.maps_to().or(self.path.as_deref())
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(T::deserialize(raw).unwrap_or_default())
}

/// Ordered control descriptors, as loaded from `{"controls": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlCatalog {
    pub controls: Vec<ControlDescriptor>,
}

impl ControlCatalog {
    pub fn new(controls: Vec<ControlDescriptor>) -> Self {
        Self { controls }
    }

    /// Never fails: a document without a `controls` array is an empty
    /// catalog, and entries that do not decode as descriptors are dropped.
    pub fn from_value(document: &Value) -> Self {
        let Some(entries) = document.get("controls").and_then(Value::as_array) else {
            if !document.is_null() {
                warn!("control catalog has no `controls` array; using an empty catalog");
            }
            return Self::default();
        };

        let controls = entries
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                if !entry.is_object() {
                    warn!(position, "skipping control entry that is not an object");
                    return None;
                }
                match ControlDescriptor::deserialize(entry) {
                    Ok(descriptor) => Some(descriptor),
                    Err(error) => {
                        warn!(position, %error, "skipping malformed control entry");
                        None
                    }
                }
            })
            .collect();
        Self { controls }
    }

    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(document) => Self::from_value(&document),
            Err(error) => {
                warn!(%error, "control catalog is not valid JSON; using an empty catalog");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlDescriptor> {
        self.controls.iter()
    }

    /// `(path, maps_to)` for every descriptor declaring both.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.controls.iter().filter_map(|control| {
            let path = control.path.as_deref().filter(|path| !path.is_empty())?;
            Some((path, control.maps_to()?))
        })
    }
}

/// Lookup from declared `path` to descriptor.
#[derive(Debug, Clone, Default)]
pub struct ControlIndex {
    by_path: HashMap<String, ControlDescriptor>,
    duplicates: Vec<String>,
}

impl ControlIndex {
    /// Descriptors without a `path` are left out. When a path is declared
    /// more than once the last descriptor wins and the path is recorded in
    /// [`ControlIndex::duplicate_paths`].
    pub fn build(catalog: &ControlCatalog) -> Self {
        let mut by_path = HashMap::with_capacity(catalog.len());
        let mut duplicates = Vec::new();
        for control in catalog.iter() {
            let Some(path) = control.path.as_ref() else {
                continue;
            };
            if by_path.insert(path.clone(), control.clone()).is_some() {
                warn!(%path, "control path declared more than once; last declaration wins");
                if !duplicates.contains(path) {
                    duplicates.push(path.clone());
                }
            }
        }
        Self {
            by_path,
            duplicates,
        }
    }

    pub fn get(&self, path: &str) -> Option<&ControlDescriptor> {
        self.by_path.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn duplicate_paths(&self) -> &[String] {
        &self.duplicates
    }
}

pub fn build_index(catalog: &ControlCatalog) -> ControlIndex {
    ControlIndex::build(catalog)
}

#[cfg(test)]
#[path = "tests/descriptor_tests.rs"]
mod tests;
