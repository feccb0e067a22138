use serde::ser::{Serialize, Serializer};

use crate::date;

use super::Value;

// Serde has no date type; dates are serialized as RFC 3339 text, the same form `from_value`
// presents them in.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Integer(integer) => serializer.serialize_i64(*integer),
            Self::Real32(real) => serializer.serialize_f32(*real),
            Self::Real64(real) => serializer.serialize_f64(*real),
            Self::String(string) => serializer.serialize_str(string),
            Self::Data(data) => serde_bytes::Bytes::new(data).serialize(serializer),
            Self::Date(value) => serializer.serialize_str(&date::to_rfc3339(value)),
            Self::Array(array) => serializer.collect_seq(array),
            Self::Dictionary(dict) => serializer.collect_map(dict),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::value::Dictionary;

    use super::*;

    #[test]
    fn to_json() {
        let value = Value::Dictionary(Dictionary::from([
            ("a".to_string(), Value::Integer(1)),
            ("b".to_string(), Value::Real64(2.5)),
            (
                "c".to_string(),
                Value::Array(vec![Value::Bool(true), Value::Data(b"\x01\x02".to_vec())]),
            ),
            (
                "d".to_string(),
                Value::Date(Utc.with_ymd_and_hms(2018, 3, 19, 23, 58, 47).unwrap()),
            ),
        ]));
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"a":1,"b":2.5,"c":[true,[1,2]],"d":"2018-03-19T23:58:47Z"}"#,
        );
    }
}
