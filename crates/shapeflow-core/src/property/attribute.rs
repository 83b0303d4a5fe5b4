//! Values produced by property getters.

use serde::Serialize;
use serde_json::{Map, Value};

/// Key written into a serialized object whose owner switched serialization off.
///
/// Only appears when such an object is still written because its property is forced.
pub const DISABLED_MARKER: &str = "serialization_disabled";

/// A property value as seen by the registry.
///
/// Plain values are written as they are. Objects carry their own
/// serialization switch and are dropped while disabled unless the property
/// is forced. Sequences are filtered element by element.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Value(Value),
    Object { enabled: bool, value: Value },
    Sequence(Vec<Attribute>),
}

impl Attribute {
    /// Wrap any serializable value.
    pub fn of<S: Serialize + ?Sized>(value: &S) -> Self {
        Attribute::Value(to_value(value))
    }

    /// Wrap a nested object that can opt out of serialization.
    pub fn object<S: Serialize + ?Sized>(enabled: bool, value: &S) -> Self {
        Attribute::Object {
            enabled,
            value: to_value(value),
        }
    }

    pub fn sequence(items: impl IntoIterator<Item = Attribute>) -> Self {
        Attribute::Sequence(items.into_iter().collect())
    }

    /// Encode for persistence.
    ///
    /// Returns `None` when the attribute is a disabled object and `forced` is false.
    pub fn encode(self, forced: bool) -> Option<Value> {
        match self {
            Attribute::Value(value) => Some(value),
            Attribute::Object { enabled: true, value } => Some(value),
            Attribute::Object {
                enabled: false,
                value,
            } => forced.then(|| mark_disabled(value)),
            Attribute::Sequence(items) => Some(Value::Array(
                items
                    .into_iter()
                    .filter_map(|item| item.encode(forced))
                    .collect(),
            )),
        }
    }
}

/// Whether a serialized object carries the disabled marker.
pub fn is_marked_disabled(value: &Value) -> bool {
    value
        .get(DISABLED_MARKER)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn mark_disabled(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert(DISABLED_MARKER.to_string(), Value::Bool(true));
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert(DISABLED_MARKER.to_string(), Value::Bool(true));
            map.insert("value".to_string(), other);
            Value::Object(map)
        }
    }
}

fn to_value<S: Serialize + ?Sized>(value: &S) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        log::error!("Failed to convert property value: {}", e);
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disabled_object_skipped_unless_forced() {
        let attr = Attribute::object(false, &json!({ "a": 1 }));
        assert_eq!(attr.clone().encode(false), None);

        let forced = attr.encode(true).unwrap();
        assert!(is_marked_disabled(&forced));
        assert_eq!(forced["a"], 1);
    }

    #[test]
    fn test_sequence_filtered_per_element() {
        let attr = Attribute::sequence([
            Attribute::object(true, &json!({ "n": 1 })),
            Attribute::object(false, &json!({ "n": 2 })),
            Attribute::of(&3),
        ]);
        assert_eq!(attr.encode(false), Some(json!([{ "n": 1 }, 3])));
    }

    #[test]
    fn test_plain_value_marker_wraps() {
        let value = Attribute::object(false, &5).encode(true).unwrap();
        assert!(is_marked_disabled(&value));
        assert_eq!(value["value"], 5);
    }
}
