use crate::config::LoadOptions;
use crate::error::RustyPbixError;
use crate::table::infer_scalar;
use crate::table::Scalar;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;
use std::fmt;

/// One JSON object with its keys in document order.
struct Record(Vec<(String, Value)>);

impl Record {
    /// Value of `key`; the last occurrence wins when a key repeats.
    fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().rev().find(|(name, _)| name == key).map(|(_, value)| value)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordVisitor;

        impl<'de> de::Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    entries.push((key, value));
                }
                Ok(Record(entries))
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Reads an array of objects. Columns appear in first-seen key order across all rows.
pub(super) fn read_json(bytes: &[u8], options: &LoadOptions) -> Result<(Vec<String>, Vec<Vec<Scalar>>), RustyPbixError> {
    let records: Vec<Record> = serde_json::from_slice(bytes)?;

    let mut names = Vec::<String>::new();
    for record in &records {
        for (key, _) in &record.0 {
            if !names.contains(key) {
                names.push(key.to_owned());
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            names
                .iter()
                .map(|name| record.get(name).map(|value| to_scalar(value, options)).unwrap_or(Scalar::Null))
                .collect()
        })
        .collect();
    Ok((names, rows))
}

fn to_scalar(value: &Value, options: &LoadOptions) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Bool(flag) => Scalar::Text(flag.to_string()),
        Value::Number(number) => number.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
        Value::String(text) => infer_scalar(text, options),
        nested => Scalar::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_in_first_seen_order() {
        let json = br#"[
            {"date": "2024-01-01", "revenue": 100},
            {"revenue": 150, "date": "2024-02-01", "region": "North"},
            {"date": "2024-03-01", "revenue": "90", "tags": ["a", "b"], "active": true}
        ]"#;
        let (names, rows) = read_json(json, &LoadOptions::default()).unwrap();
        assert_eq!(names, ["date", "revenue", "region", "tags", "active"]);
        assert_eq!(rows[0][2], Scalar::Null);
        assert_eq!(rows[1][1], Scalar::Number(150.0));
        assert_eq!(rows[2][1], Scalar::Number(90.0));
        assert_eq!(rows[2][3], Scalar::Text(r#"["a","b"]"#.to_owned()));
        assert_eq!(rows[2][4], Scalar::Text("true".to_owned()));
    }

    #[test]
    fn rejects_non_arrays_and_non_objects() {
        assert!(read_json(br#"{"date": "2024-01-01"}"#, &LoadOptions::default()).is_err());
        let error = read_json(br#"[{"a": 1}, 2]"#, &LoadOptions::default()).unwrap_err();
        assert!(error.to_string().contains("expected an object"));
    }
}
