use serde_json::{Map, Value};

/// A record exactly as the backend sent it.
///
/// Field names and value types are whatever the store produced. Nothing in
/// here is validated; consumers are expected to go through the normalizer
/// instead of reading fields directly.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Non-object values carry no fields and become an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The value if it is a JSON string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The value if it is a JSON string with at least one character.
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.str_field(key).filter(|value| !value.is_empty())
    }

    /// The value if it is a JSON number. Strings holding digits do not count.
    pub fn number_field(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Value::Number(number)) => number.as_f64(),
            _ => None,
        }
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Loose truthiness: absent, null, false, 0, NaN and "" are false.
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number
                .as_f64()
                .is_some_and(|value| value != 0.0 && !value.is_nan()),
            Some(Value::String(text)) => !text.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_are_only_read_from_numeric_values() {
        let record = RawRecord::from_value(json!({
            "lat": 10.5,
            "long": "20.1",
            "zero": 0,
        }));
        assert_eq!(record.number_field("lat"), Some(10.5));
        assert_eq!(record.number_field("long"), None);
        assert_eq!(record.number_field("zero"), Some(0.0));
        assert_eq!(record.number_field("missing"), None);
    }

    #[test]
    fn truthiness_follows_loose_rules() {
        let record = RawRecord::from_value(json!({
            "yes": true,
            "no": false,
            "empty": "",
            "text": "x",
            "zero": 0,
            "one": 1,
            "nothing": null,
        }));
        assert!(record.is_truthy("yes"));
        assert!(!record.is_truthy("no"));
        assert!(!record.is_truthy("empty"));
        assert!(record.is_truthy("text"));
        assert!(!record.is_truthy("zero"));
        assert!(record.is_truthy("one"));
        assert!(!record.is_truthy("nothing"));
        assert!(!record.is_truthy("absent"));
    }

    #[test]
    fn non_object_values_become_empty_records() {
        assert!(RawRecord::from_value(json!([1, 2])).fields().is_empty());
        assert!(RawRecord::from_value(json!("id")).fields().is_empty());
    }
}
