use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Number, Value as JsonValue};

/// A document element as seen by the pipeline stages.
///
/// Numeric subtypes are kept distinct: `Int(1)` and `Float(1.0)` are
/// different values for deduplication and grouping. Object fields preserve
/// the order they arrived in; key order is only neutralized when a value is
/// fingerprinted.
#[derive(Debug, Clone)]
pub enum DocValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<DocValue>),
    Object(Vec<(String, DocValue)>),
}

impl DocValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DocValue::Null => "Null",
            DocValue::Bool(_) => "Boolean",
            DocValue::Int(_) => "Integer",
            DocValue::Float(_) => "Float",
            DocValue::String(_) => "String",
            DocValue::Array(_) => "Array",
            DocValue::Object(_) => "Object",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, DocValue::Int(_) | DocValue::Float(_))
    }

    /// Numeric view used by the arithmetic aggregators.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DocValue::Int(i) => Some(*i as f64),
            DocValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Field lookup on object values. First match wins.
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        match self {
            DocValue::Object(fields) => {
                fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    pub fn from_json(value: &JsonValue) -> DocValue {
        match value {
            JsonValue::Null => DocValue::Null,
            JsonValue::Bool(b) => DocValue::Bool(*b),
            JsonValue::Number(n) => DocValue::from_number(n),
            JsonValue::String(s) => DocValue::String(s.clone()),
            JsonValue::Array(items) => {
                DocValue::Array(items.iter().map(DocValue::from_json).collect())
            }
            JsonValue::Object(fields) => DocValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), DocValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn from_number(n: &Number) -> DocValue {
        if let Some(i) = n.as_i64() {
            DocValue::Int(i)
        } else {
            // u64 beyond i64::MAX and proper floats both land here.
            DocValue::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            DocValue::Null => JsonValue::Null,
            DocValue::Bool(b) => JsonValue::Bool(*b),
            DocValue::Int(i) => JsonValue::Number(Number::from(*i)),
            DocValue::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DocValue::String(s) => JsonValue::String(s.clone()),
            DocValue::Array(items) => {
                JsonValue::Array(items.iter().map(DocValue::to_json).collect())
            }
            DocValue::Object(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                JsonValue::Object(map)
            }
        }
    }
}

impl From<&JsonValue> for DocValue {
    fn from(value: &JsonValue) -> Self {
        DocValue::from_json(value)
    }
}

impl From<JsonValue> for DocValue {
    fn from(value: JsonValue) -> Self {
        DocValue::from_json(&value)
    }
}

impl PartialEq for DocValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DocValue::Null, DocValue::Null) => true,
            (DocValue::Bool(a), DocValue::Bool(b)) => a == b,
            (DocValue::Int(a), DocValue::Int(b)) => a == b,
            // Bit-exact: NaN == NaN, but Int(1) never equals Float(1.0).
            (DocValue::Float(a), DocValue::Float(b)) => a.to_bits() == b.to_bits(),
            (DocValue::String(a), DocValue::String(b)) => a == b,
            (DocValue::Array(a), DocValue::Array(b)) => a == b,
            (DocValue::Object(a), DocValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DocValue {}

impl fmt::Display for DocValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn order_rank(value: Option<&DocValue>) -> u8 {
    match value {
        None => 0,
        Some(DocValue::Null) => 1,
        Some(DocValue::Bool(_)) => 2,
        Some(DocValue::Int(_)) | Some(DocValue::Float(_)) => 3,
        Some(DocValue::String(_)) => 4,
        Some(DocValue::Array(_)) => 5,
        Some(DocValue::Object(_)) => 6,
    }
}

/// Total order used by the extremum aggregators:
/// `Undefined < Null < Bool(false) < Bool(true) < Number < String`.
/// `None` stands for undefined. Numbers compare numerically across subtypes,
/// strings by codepoint. Arrays and objects only carry a rank; extremum
/// aggregators reject them before comparison.
pub fn compare_values(a: Option<&DocValue>, b: Option<&DocValue>) -> Ordering {
    let (ra, rb) = (order_rank(a), order_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Some(DocValue::Bool(x)), Some(DocValue::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) if x.is_number() && y.is_number() => {
            let (fx, fy) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            fx.partial_cmp(&fy).unwrap_or(Ordering::Equal)
        }
        (Some(DocValue::String(x)), Some(DocValue::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
