//! Response normalizer: raw `HttpResponse` to `Outcome` or `ApiError`.
//!
//! | raw result                        | normalized                   |
//! |-----------------------------------|------------------------------|
//! | 204, or 2xx with a blank body     | `Outcome::Empty`             |
//! | 2xx with a JSON body              | `Outcome::Json(value)`       |
//! | 2xx with a malformed body         | `ApiError::Decode`           |
//! | 2xx whose body could not be read  | `ApiError::Transport`        |
//! | any other status                  | `ApiError::HttpStatus`       |
//!
//! The decoded value is schema-agnostic. `Outcome::decode` turns it into a
//! caller type, matching object keys against the target's field names without
//! regard to ASCII case, so `PageToken`, `pagetoken` and `PAGETOKEN` all fill
//! a `pageToken` field.

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, TransportError};
use crate::http::{HttpResponse, ResponseBody};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Success without content. Not an error.
    Empty,
    Json(Value),
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Outcome::Empty => None,
            Outcome::Json(value) => Some(value),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Empty => None,
            Outcome::Json(value) => Some(value),
        }
    }

    /// Decode into `T`; `None` for an empty outcome.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Option<T>, ApiError> {
        self.into_value().map(decode_value).transpose()
    }

    /// Decode into `T`, treating an empty outcome as a contract violation.
    pub fn decode_body<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Outcome::Json(value) => decode_value(value),
            Outcome::Empty => Err(ApiError::Decode {
                message: "expected a JSON body but the response had no content".to_string(),
                body: String::new(),
            }),
        }
    }
}

/// Decode a generic value into `T`, matching keys case-insensitively.
pub fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    T::deserialize(CaseInsensitive(value.clone()))
        .map_err(|e| ApiError::decode(e, value.to_string()))
}

/// Classify a raw response.
pub fn normalize(response: HttpResponse) -> Result<Outcome, ApiError> {
    let status = response.status;

    if !response.is_success() {
        let body = match response.body {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Unreadable(reason) => {
                warn!(status, error = %reason, "error response body unavailable");
                None
            }
        };
        debug!(status, "request failed with HTTP status");
        return Err(ApiError::HttpStatus { status, body });
    }

    if status == 204 {
        return Ok(Outcome::Empty);
    }

    let text = match response.body {
        ResponseBody::Text(text) => text,
        ResponseBody::Unreadable(reason) => return Err(TransportError::Body(reason).into()),
    };
    if text.trim().is_empty() {
        return Ok(Outcome::Empty);
    }
    serde_json::from_str(&text)
        .map(Outcome::Json)
        .map_err(|e| ApiError::decode(e, text))
}

/// Deserializer over a JSON value that renames object keys to the field
/// names the visited struct declares when they differ only in ASCII case.
///
/// Nested objects and arrays are wrapped again, so the matching applies at
/// every depth. Maps and enum payloads keep their keys verbatim.
struct CaseInsensitive(Value);

impl<'de> IntoDeserializer<'de, serde_json::Error> for CaseInsensitive {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> Deserializer<'de> for CaseInsensitive {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => {
                let mut seq = SeqDeserializer::<_, serde_json::Error>::new(
                    items.into_iter().map(CaseInsensitive),
                );
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Value::Object(map) => {
                let mut access = MapDeserializer::<_, serde_json::Error>::new(
                    map.into_iter().map(|(k, v)| (k, CaseInsensitive(v))),
                );
                let value = visitor.visit_map(&mut access)?;
                access.end()?;
                Ok(value)
            }
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(CaseInsensitive(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => {
                CaseInsensitive(Value::Object(align_keys(map, fields))).deserialize_any(visitor)
            }
            other => CaseInsensitive(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

/// Rename keys that match a field ignoring ASCII case. An exact key wins
/// over a case variant of the same field.
fn align_keys(map: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    let mut aligned = Map::new();
    let mut renamed = Vec::new();
    for (key, value) in map {
        match fields
            .iter()
            .find(|field| **field != key && field.eq_ignore_ascii_case(&key))
        {
            Some(field) => renamed.push((field.to_string(), value)),
            None => {
                aligned.insert(key, value);
            }
        }
    }
    for (key, value) in renamed {
        aligned.entry(key).or_insert(value);
    }
    aligned
}

/// Case-insensitive member lookup on a JSON object.
pub fn json_get_ci<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
