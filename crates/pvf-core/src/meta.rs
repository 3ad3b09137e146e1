use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata attached to an ensemble, a fit or a derived result.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Loosely typed metadata value as found in simulation logs and result files.
///
/// Integers and floats compare numerically, so `2` and `2.0` describe the same
/// value when checking consistency across inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Explicitly absent value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Free text.
    Text(String),
    /// Ordered list of values.
    List(Vec<MetaValue>),
    /// Nested mapping.
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    /// Returns the value as a float when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(value) => Some(*value as f64),
            MetaValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an integer when it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(value) => Some(*value),
            MetaValue::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(*value as i64)
            }
            _ => None,
        }
    }

    /// Returns the text payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the list payload.
    pub fn as_list(&self) -> Option<&[MetaValue]> {
        match self {
            MetaValue::List(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the map payload.
    pub fn as_map(&self) -> Option<&BTreeMap<String, MetaValue>> {
        match self {
            MetaValue::Map(values) => Some(values),
            _ => None,
        }
    }

    /// Whether the value is [`MetaValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            MetaValue::Null => 0,
            MetaValue::Bool(_) => 1,
            MetaValue::Int(_) | MetaValue::Float(_) => 2,
            MetaValue::Text(_) => 3,
            MetaValue::List(_) => 4,
            MetaValue::Map(_) => 5,
        }
    }
}

impl PartialEq for MetaValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MetaValue {}

impl PartialOrd for MetaValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetaValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (MetaValue::Int(a), MetaValue::Int(b)) => a.cmp(b),
            (MetaValue::Bool(a), MetaValue::Bool(b)) => a.cmp(b),
            (MetaValue::Text(a), MetaValue::Text(b)) => a.cmp(b),
            (MetaValue::List(a), MetaValue::List(b)) => a.cmp(b),
            (MetaValue::Map(a), MetaValue::Map(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => write!(f, "null"),
            MetaValue::Bool(value) => write!(f, "{value}"),
            MetaValue::Int(value) => write!(f, "{value}"),
            MetaValue::Float(value) => write!(f, "{value:?}"),
            MetaValue::Text(value) => write!(f, "{value}"),
            MetaValue::List(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            MetaValue::Map(values) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! meta_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for MetaValue {
            fn from(value: $ty) -> Self {
                MetaValue::Int(value as i64)
            }
        })*
    };
}

meta_from_int!(i32, i64, u32, usize);

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<Vec<MetaValue>> for MetaValue {
    fn from(values: Vec<MetaValue>) -> Self {
        MetaValue::List(values)
    }
}

impl From<Metadata> for MetaValue {
    fn from(values: Metadata) -> Self {
        MetaValue::Map(values)
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(MetaValue::Null)
    }
}

/// Anything that carries ensemble or fit metadata.
pub trait Described {
    /// Returns the metadata map.
    fn metadata(&self) -> &Metadata;
}

impl Described for Metadata {
    fn metadata(&self) -> &Metadata {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_floats_compare_numerically() {
        assert_eq!(MetaValue::Int(2), MetaValue::Float(2.0));
        assert!(MetaValue::Int(1) < MetaValue::Float(1.5));
        assert_ne!(MetaValue::Int(2), MetaValue::Text("2".into()));
    }

    #[test]
    fn untagged_json_round_trip() {
        let text = r#"{"Nc": 2, "beta": 2.25, "op": "sym", "m": null}"#;
        let value: MetaValue = serde_json::from_str(text).expect("parse");
        let map = value.as_map().expect("map");
        assert_eq!(map["Nc"].as_i64(), Some(2));
        assert_eq!(map["beta"].as_f64(), Some(2.25));
        assert_eq!(map["op"].as_str(), Some("sym"));
        assert!(map["m"].is_null());
    }
}
