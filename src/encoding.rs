//! Query-string encoding for the Splitwise API.
//!
//! Splitwise takes nearly all of its parameters in the query string, including array-valued
//! ones such as the members of a new group or the per-user shares of an expense. The usual
//! bracket syntax (`users[0][user_id]=1`) does not survive OAuth 1.0a signature
//! canonicalisation on their side, so the API accepts a flat positional form instead:
//!
//! ```text
//! users__0__user_id=1&users__0__owed_share=5&users__1__user_id=2
//! ```
//!
//! ## Building blocks
//!
//! - [`encode_key_value`] - one `key=value` fragment, or nothing for an omitted value
//! - [`encode_params`] / [`ParamMap::encode`] - a whole mapping joined with `&`
//! - [`encode_object_array`] - the positional `prefix__i__key=value` fragments
//! - [`flatten`] - removes one level of nesting from a sequence of sequences
//!
//! Array parameters are composed by storing the output of [`encode_object_array`] as a
//! [`ParamValue::Fragments`] entry in the top-level [`ParamMap`]; those fragments are spliced
//! into the final query string verbatim.
//!
//! ```
//! use splitwise_client::encoding::{encode_object_array, ParamMap};
//!
//! let shares = vec![
//!     ParamMap::new().with("user_id", 1).with("owed_share", "5.00"),
//!     ParamMap::new().with("user_id", 2).with("owed_share", "5.00"),
//! ];
//! let params = ParamMap::new()
//!     .with("cost", "10.00")
//!     .with("users", encode_object_array("users", &shares));
//!
//! assert_eq!(
//!     params.encode(),
//!     "cost=10.00&users__0__user_id=1&users__0__owed_share=5.00&users__1__user_id=2&users__1__owed_share=5.00"
//! );
//! ```

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while turning caller input into query parameters.
///
/// These are always produced before any request is sent.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("parameter `{key}` has an unsupported value ({kind}); expected a string, number, boolean, null or a list of encoded fragments")]
    InvalidParameterValue { key: String, kind: &'static str },

    #[error("parameters must be given as a flat object, got {kind}")]
    NotAMapping { kind: &'static str },

    #[error("parameter `{key}` is not accepted, keys must be one of: {}", .allowed.join(", "))]
    UnexpectedKey { key: String, allowed: Vec<String> },

    #[error("failed to serialize parameters: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single scalar parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Decimal(n) => f.write_str(&decimal_text(*n)),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Renders a float the way JavaScript's `String(number)` does: `NaN`, `Infinity`, `0` for
/// negative zero, and exponent form with an explicit sign outside `[1e-6, 1e21)`.
fn decimal_text(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        // Display gives the shortest round-trip digits and drops ".0" (1.0 -> "1")
        return n.to_string();
    }

    let text = format!("{:e}", n);
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => text,
    }
}

/// The value side of a [`ParamMap`] entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Encoded as `key=value`.
    Scalar(Scalar),
    /// Left out of the query string entirely.
    Omitted,
    /// Already-encoded fragments, spliced in as-is. The entry's own key is not used.
    Fragments(Vec<String>),
}

impl ParamValue {
    /// Converts a JSON value, rejecting shapes the query dialect cannot express.
    ///
    /// JSON arrays are only accepted when every element is a string, in which case they are
    /// treated as pre-encoded fragments.
    pub fn from_json(key: &str, value: Value) -> Result<Self, EncodeError> {
        match value {
            Value::Null => Ok(ParamValue::Omitted),
            Value::Bool(b) => Ok(b.into()),
            Value::String(s) => Ok(s.into()),
            Value::Number(n) => {
                let scalar = if let Some(i) = n.as_i64() {
                    Scalar::Integer(i)
                } else if n.is_u64() {
                    Scalar::Text(n.to_string())
                } else {
                    Scalar::Decimal(n.as_f64().unwrap_or_default())
                };
                Ok(ParamValue::Scalar(scalar))
            }
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    _ => Err(EncodeError::InvalidParameterValue {
                        key: key.to_string(),
                        kind: "array containing non-string elements",
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::Fragments),
            Value::Object(_) => Err(EncodeError::InvalidParameterValue {
                key: key.to_string(),
                kind: "nested object",
            }),
        }
    }

    pub fn is_omitted(&self) -> bool {
        matches!(self, ParamValue::Omitted)
    }
}

impl From<Scalar> for ParamValue {
    fn from(value: Scalar) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(Scalar::Text(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(Scalar::Text(value.to_string()))
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Scalar(Scalar::Text(value.clone()))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Scalar(Scalar::Bool(value))
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Scalar(Scalar::Integer(value.into()))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Scalar(Scalar::Integer(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Scalar(Scalar::Integer(value.into()))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => ParamValue::Scalar(Scalar::Integer(v)),
            Err(_) => ParamValue::Scalar(Scalar::Text(value.to_string())),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(Scalar::Decimal(value))
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::Fragments(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Omitted, Into::into)
    }
}

/// An ordered, flat mapping of parameter names to values.
///
/// Keys are unique; inserting an existing key replaces its value but keeps its position.
/// Iteration order is insertion order, which is also the order of the encoded output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts every entry of `other`, in order, overriding existing keys.
    pub fn merge(&mut self, other: ParamMap) -> &mut Self {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a mapping from a JSON object, keeping the object's key order.
    pub fn from_json(value: Value) -> Result<Self, EncodeError> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(EncodeError::NotAMapping {
                    kind: json_kind(&other),
                })
            }
        };

        let mut params = ParamMap::new();
        for (key, value) in object {
            let value = ParamValue::from_json(&key, value)?;
            params.insert(key, value);
        }
        Ok(params)
    }

    /// Builds a mapping from any serializable struct or map.
    ///
    /// Field order follows the serialized order (declaration order for derived structs).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, EncodeError> {
        Self::from_json(serde_json::to_value(value)?)
    }

    /// Fails on the first key that is not in `allowed`.
    pub fn ensure_keys(&self, allowed: &[&str]) -> Result<(), EncodeError> {
        match self.keys().find(|key| !allowed.contains(key)) {
            Some(key) => Err(EncodeError::UnexpectedKey {
                key: key.to_string(),
                allowed: allowed.iter().map(|k| k.to_string()).collect(),
            }),
            None => Ok(()),
        }
    }

    /// Encodes the whole mapping as a query string (without a leading `?`).
    pub fn encode(&self) -> String {
        encode_params(self)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ParamMap::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// RFC 3986 percent-encoding: everything but `A-Z a-z 0-9 - _ . ~` is escaped, space is `%20`.
pub fn percent_encode(input: &str) -> Cow<'_, str> {
    urlencoding::encode(input)
}

/// Encodes one `key=value` fragment. `None` means the parameter is omitted.
pub fn encode_key_value(key: &str, value: Option<&Scalar>) -> Option<String> {
    let value = value?;
    Some(format!(
        "{}={}",
        percent_encode(key),
        percent_encode(&value.to_string())
    ))
}

/// Encodes a mapping as `&`-joined fragments in insertion order.
///
/// Omitted values leave no trace and [`ParamValue::Fragments`] are spliced in unchanged.
pub fn encode_params(params: &ParamMap) -> String {
    let fragments: Vec<Vec<String>> = params
        .iter()
        .map(|(key, value)| match value {
            ParamValue::Scalar(scalar) => encode_key_value(key, Some(scalar)).into_iter().collect(),
            ParamValue::Omitted => Vec::new(),
            ParamValue::Fragments(fragments) => fragments.clone(),
        })
        .collect();

    flatten(fragments).join("&")
}

/// Encodes JSON input as a query string, rejecting nested objects and non-string arrays.
pub fn encode_json_params(value: Value) -> Result<String, EncodeError> {
    Ok(ParamMap::from_json(value)?.encode())
}

/// Encodes a list of objects in the positional `prefix__index__key=value` form.
///
/// The prefix and every key and value are percent-encoded; the index is plain decimal.
/// Omitted values inside an object are skipped. Fragments nested inside an object are
/// re-rooted under that object's `prefix__index__` position.
pub fn encode_object_array(prefix: &str, objects: &[ParamMap]) -> Vec<String> {
    let prefix = percent_encode(prefix);

    let nested: Vec<Vec<String>> = objects
        .iter()
        .enumerate()
        .map(|(index, object)| {
            let position = format!("{}__{}__", prefix, index);
            let fragments: Vec<Vec<String>> = object
                .iter()
                .map(|(key, value)| match value {
                    ParamValue::Scalar(scalar) => encode_key_value(key, Some(scalar))
                        .map(|fragment| format!("{}{}", position, fragment))
                        .into_iter()
                        .collect(),
                    ParamValue::Omitted => Vec::new(),
                    ParamValue::Fragments(inner) => inner
                        .iter()
                        .map(|fragment| format!("{}{}", position, fragment))
                        .collect(),
                })
                .collect();
            flatten(fragments)
        })
        .collect();

    flatten(nested)
}

/// Removes one level of nesting, keeping concatenation order.
pub fn flatten<I>(nested: I) -> Vec<<I::Item as IntoIterator>::Item>
where
    I: IntoIterator,
    I::Item: IntoIterator,
{
    nested.into_iter().flatten().collect()
}
