//! Lenient decoding of CiviCRM-style values
//!
//! CiviCRM hands values around loosely typed: identifiers arrive as integers
//! or numeric strings, empty selections as `""`, booleans as `1`/`"0"`, and
//! multi-selects either as arrays or comma-separated strings. The helpers in
//! this module normalise such values, both from a `serde_json::Value` and as
//! `#[serde(deserialize_with = "...")]` adapters.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Error produced when a loose value cannot be interpreted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, got {found}")]
pub struct LenientError {
    pub expected: &'static str,
    pub found: String,
}

impl LenientError {
    fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.to_string(),
        }
    }
}

/// Interprets a value as an optional integer.
///
/// `null` and blank strings are `None`.
pub fn value_to_opt_i64(value: &Value) -> Result<Option<i64>, LenientError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| LenientError::new("an integer", value)),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| LenientError::new("an integer", value)),
        _ => Err(LenientError::new("an integer", value)),
    }
}

/// Interprets a value as an optional boolean.
pub fn value_to_opt_bool(value: &Value) -> Result<Option<bool>, LenientError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(LenientError::new("a boolean", value)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(LenientError::new("a boolean", value)),
        },
        _ => Err(LenientError::new("a boolean", value)),
    }
}

/// Interprets a value as an optional string; numbers are rendered as text.
pub fn value_to_opt_string(value: &Value) -> Result<Option<String>, LenientError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(LenientError::new("a string", value)),
    }
}

/// Interprets a value as a list of integer ids.
///
/// Accepts `null`, `""`, `"1,2"`, a single integer, or an array mixing
/// integers and numeric strings. Blank entries are skipped.
pub fn value_to_id_list(value: &Value) -> Result<Vec<i64>, LenientError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Number(_) => Ok(value_to_opt_i64(value)?.into_iter().collect()),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<i64>()
                    .map_err(|_| LenientError::new("a list of integers", value))
            })
            .collect(),
        Value::Array(items) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                if let Some(id) = value_to_opt_i64(item)? {
                    ids.push(id);
                }
            }
            Ok(ids)
        }
        _ => Err(LenientError::new("a list of integers", value)),
    }
}

fn deserialize_value<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null))
}

/// `deserialize_with` adapter for `Option<i64>`
pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_value(deserializer)?;
    value_to_opt_i64(&value).map_err(serde::de::Error::custom)
}

/// `deserialize_with` adapter for a required `i64`
pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_value(deserializer)?;
    value_to_opt_i64(&value)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("expected an integer, got nothing"))
}

/// `deserialize_with` adapter for `Option<bool>`
pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_value(deserializer)?;
    value_to_opt_bool(&value).map_err(serde::de::Error::custom)
}

/// `deserialize_with` adapter for `Option<String>`
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_value(deserializer)?;
    value_to_opt_string(&value).map_err(serde::de::Error::custom)
}

/// `deserialize_with` adapter for a required string that may arrive as a number
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_value(deserializer)?;
    Ok(value_to_opt_string(&value)
        .map_err(serde::de::Error::custom)?
        .unwrap_or_default())
}

/// `deserialize_with` adapter for id lists
pub fn id_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_value(deserializer)?;
    value_to_id_list(&value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_opt_i64_accepts_numbers_and_numeric_strings() {
        assert_eq!(value_to_opt_i64(&json!(5)).unwrap(), Some(5));
        assert_eq!(value_to_opt_i64(&json!("12")).unwrap(), Some(12));
        assert_eq!(value_to_opt_i64(&json!(" 7 ")).unwrap(), Some(7));
    }

    #[test]
    fn test_opt_i64_treats_blank_as_none() {
        assert_eq!(value_to_opt_i64(&json!("")).unwrap(), None);
        assert_eq!(value_to_opt_i64(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_opt_i64_rejects_garbage() {
        let err = value_to_opt_i64(&json!("abc")).unwrap_err();
        assert_eq!(err.expected, "an integer");
        assert!(value_to_opt_i64(&json!(1.5)).is_err());
        assert!(value_to_opt_i64(&json!([1])).is_err());
    }

    #[test]
    fn test_opt_bool_variants() {
        assert_eq!(value_to_opt_bool(&json!(true)).unwrap(), Some(true));
        assert_eq!(value_to_opt_bool(&json!(0)).unwrap(), Some(false));
        assert_eq!(value_to_opt_bool(&json!("1")).unwrap(), Some(true));
        assert_eq!(value_to_opt_bool(&json!("No")).unwrap(), Some(false));
        assert_eq!(value_to_opt_bool(&json!("")).unwrap(), None);
        assert!(value_to_opt_bool(&json!(2)).is_err());
    }

    #[test]
    fn test_id_list_variants() {
        assert_eq!(value_to_id_list(&json!("")).unwrap(), Vec::<i64>::new());
        assert_eq!(value_to_id_list(&json!("3, 4,")).unwrap(), vec![3, 4]);
        assert_eq!(value_to_id_list(&json!([1, "2", ""])).unwrap(), vec![1, 2]);
        assert_eq!(value_to_id_list(&json!(9)).unwrap(), vec![9]);
        assert!(value_to_id_list(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_deserialize_with_adapters() {
        #[derive(Deserialize)]
        struct Params {
            #[serde(default, deserialize_with = "opt_int")]
            time: Option<i64>,
            #[serde(deserialize_with = "int")]
            amount: i64,
            #[serde(default, deserialize_with = "opt_bool")]
            newsletter: Option<bool>,
            #[serde(deserialize_with = "string")]
            form_id: String,
        }

        let params: Params =
            serde_json::from_value(json!({"amount": "1050", "newsletter": "1", "form_id": 42}))
                .unwrap();
        assert_eq!(params.time, None);
        assert_eq!(params.amount, 1050);
        assert_eq!(params.newsletter, Some(true));
        assert_eq!(params.form_id, "42");
    }
}
