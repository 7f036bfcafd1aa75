//! Type classification for raw document values
//!
//! Values are `serde_json::Value`s. BSON-only kinds arrive as MongoDB Extended
//! JSON markers (`{"$oid": ..}`, `{"$date": ..}`, ...) and are recognized before
//! any generic number/object check.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::InferenceError;

/// Canonical type tag of an observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Double,
    Number,
    String,
    Boolean,
    Null,
    /// Synthetic: the field was absent from a document
    Undefined,
    Date,
    RegExp,
    #[serde(rename = "ObjectID")]
    ObjectId,
    Binary,
    Symbol,
    Code,
    #[serde(rename = "DBRef")]
    DbRef,
    Timestamp,
    Long,
    MinKey,
    MaxKey,
    Array,
    Document,
}

impl TypeTag {
    /// Display name used in serialized output
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Double => "Double",
            TypeTag::Number => "Number",
            TypeTag::String => "String",
            TypeTag::Boolean => "Boolean",
            TypeTag::Null => "Null",
            TypeTag::Undefined => "Undefined",
            TypeTag::Date => "Date",
            TypeTag::RegExp => "RegExp",
            TypeTag::ObjectId => "ObjectID",
            TypeTag::Binary => "Binary",
            TypeTag::Symbol => "Symbol",
            TypeTag::Code => "Code",
            TypeTag::DbRef => "DBRef",
            TypeTag::Timestamp => "Timestamp",
            TypeTag::Long => "Long",
            TypeTag::MinKey => "MinKey",
            TypeTag::MaxKey => "MaxKey",
            TypeTag::Array => "Array",
            TypeTag::Document => "Document",
        }
    }

    /// Types that carry no value beyond their presence
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            TypeTag::Null | TypeTag::Undefined | TypeTag::MinKey | TypeTag::MaxKey
        )
    }

    /// Types summarized with min/max/mean
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeTag::Number | TypeTag::Double | TypeTag::Long)
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, TypeTag::Array | TypeTag::Document)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static OBJECT_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").unwrap());

static BINARY_SUBTYPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{1,2}$").unwrap());

static REGEX_OPTIONS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[imxslu]*$").unwrap());

/// Classify a raw value into its canonical type tag
pub fn classify(value: &Value) -> Result<TypeTag, InferenceError> {
    match value {
        Value::Null => Ok(TypeTag::Null),
        Value::Bool(_) => Ok(TypeTag::Boolean),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return Ok(TypeTag::Number);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(TypeTag::Number),
                Some(_) => Ok(TypeTag::Double),
                None => Err(InferenceError::unrecognized(
                    "Number",
                    format!("{n} is not representable"),
                )),
            }
        }
        Value::String(_) => Ok(TypeTag::String),
        Value::Array(_) => Ok(TypeTag::Array),
        Value::Object(map) => Ok(marker_tag(map)?.unwrap_or(TypeTag::Document)),
    }
}

/// Match an object against the Extended JSON markers.
///
/// `Ok(None)` means the object is a plain document.
fn marker_tag(map: &Map<String, Value>) -> Result<Option<TypeTag>, InferenceError> {
    let has = |key: &str| map.contains_key(key);
    let len = map.len();

    if len == 1 {
        let (key, payload) = match map.iter().next() {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let tag = match key.as_str() {
            "$oid" => check_object_id(payload)?,
            "$date" => check_date(payload).map(|_| TypeTag::Date)?,
            "$numberLong" => check_parse::<i64>(TypeTag::Long, payload)?,
            "$numberInt" => check_parse::<i32>(TypeTag::Number, payload)?,
            "$numberDouble" => check_double(payload)?,
            "$numberDecimal" => check_decimal(payload)?,
            "$timestamp" => check_timestamp(payload)?,
            "$binary" => check_binary(payload)?,
            "$regularExpression" => check_regular_expression(payload)?,
            "$regex" => check_string(TypeTag::RegExp, payload)?,
            "$symbol" => check_string(TypeTag::Symbol, payload)?,
            "$code" => check_string(TypeTag::Code, payload)?,
            "$minKey" => check_key_bound(TypeTag::MinKey, payload)?,
            "$maxKey" => check_key_bound(TypeTag::MaxKey, payload)?,
            _ => return Ok(None),
        };
        return Ok(Some(tag));
    }

    if len == 2 && has("$binary") && has("$type") {
        let data = expect_str(TypeTag::Binary, &map["$binary"])?;
        let subtype = expect_str(TypeTag::Binary, &map["$type"])?;
        check_base64(data)?;
        check_subtype(subtype)?;
        return Ok(Some(TypeTag::Binary));
    }

    if len == 2 && has("$regex") && has("$options") {
        expect_str(TypeTag::RegExp, &map["$regex"])?;
        check_regex_options(expect_str(TypeTag::RegExp, &map["$options"])?)?;
        return Ok(Some(TypeTag::RegExp));
    }

    if len == 2 && has("$code") && has("$scope") {
        expect_str(TypeTag::Code, &map["$code"])?;
        if !map["$scope"].is_object() {
            return Err(InferenceError::unrecognized(
                "Code",
                "$scope must be a document",
            ));
        }
        return Ok(Some(TypeTag::Code));
    }

    if has("$ref") && has("$id") && (len == 2 || (len == 3 && has("$db"))) {
        expect_str(TypeTag::DbRef, &map["$ref"])?;
        if let Some(db) = map.get("$db") {
            expect_str(TypeTag::DbRef, db)?;
        }
        return Ok(Some(TypeTag::DbRef));
    }

    Ok(None)
}

fn expect_str(tag: TypeTag, payload: &Value) -> Result<&str, InferenceError> {
    payload.as_str().ok_or_else(|| {
        InferenceError::unrecognized(tag.name(), format!("expected a string, found {payload}"))
    })
}

fn check_string(tag: TypeTag, payload: &Value) -> Result<TypeTag, InferenceError> {
    expect_str(tag, payload).map(|_| tag)
}

fn check_parse<T: std::str::FromStr>(
    tag: TypeTag,
    payload: &Value,
) -> Result<TypeTag, InferenceError> {
    let text = expect_str(tag, payload)?;
    text.parse::<T>()
        .map(|_| tag)
        .map_err(|_| InferenceError::unrecognized(tag.name(), format!("invalid integer {text:?}")))
}

fn check_object_id(payload: &Value) -> Result<TypeTag, InferenceError> {
    let oid = expect_str(TypeTag::ObjectId, payload)?;
    if !OBJECT_ID_REGEX.is_match(oid) {
        return Err(InferenceError::unrecognized(
            "ObjectID",
            format!("{oid:?} is not 24 hex characters"),
        ));
    }
    Ok(TypeTag::ObjectId)
}

fn parse_double(text: &str) -> Option<f64> {
    match text {
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

fn check_double(payload: &Value) -> Result<TypeTag, InferenceError> {
    let text = expect_str(TypeTag::Double, payload)?;
    parse_double(text)
        .map(|_| TypeTag::Double)
        .ok_or_else(|| InferenceError::unrecognized("Double", format!("invalid double {text:?}")))
}

fn check_decimal(payload: &Value) -> Result<TypeTag, InferenceError> {
    let text = expect_str(TypeTag::Double, payload)?;
    parse_double(text)
        .map(|_| TypeTag::Double)
        .ok_or_else(|| InferenceError::unrecognized("Double", format!("invalid decimal {text:?}")))
}

fn check_date(payload: &Value) -> Result<DateTime<Utc>, InferenceError> {
    let invalid = |reason: String| InferenceError::unrecognized("Date", reason);
    match payload {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| invalid(format!("{text:?}: {e}"))),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| invalid(format!("{n} is not a millisecond timestamp"))),
        Value::Object(inner) => match inner.get("$numberLong") {
            Some(Value::String(text)) if inner.len() == 1 => text
                .parse::<i64>()
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .ok_or_else(|| invalid(format!("{text:?} is not a millisecond timestamp"))),
            _ => Err(invalid("expected {\"$numberLong\": \"<ms>\"}".to_string())),
        },
        other => Err(invalid(format!("unsupported payload {other}"))),
    }
}

fn check_timestamp(payload: &Value) -> Result<TypeTag, InferenceError> {
    let valid = payload.as_object().is_some_and(|ts| {
        ts.len() == 2
            && ["t", "i"].iter().all(|k| {
                ts.get(*k)
                    .and_then(Value::as_u64)
                    .is_some_and(|n| n <= u64::from(u32::MAX))
            })
    });
    if !valid {
        return Err(InferenceError::unrecognized(
            "Timestamp",
            "expected {\"t\": <u32>, \"i\": <u32>}",
        ));
    }
    Ok(TypeTag::Timestamp)
}

fn check_base64(data: &str) -> Result<(), InferenceError> {
    BASE64
        .decode(data)
        .map(|_| ())
        .map_err(|e| InferenceError::unrecognized("Binary", format!("invalid base64: {e}")))
}

fn check_subtype(subtype: &str) -> Result<(), InferenceError> {
    if !BINARY_SUBTYPE_REGEX.is_match(subtype) {
        return Err(InferenceError::unrecognized(
            "Binary",
            format!("invalid subtype {subtype:?}"),
        ));
    }
    Ok(())
}

fn check_binary(payload: &Value) -> Result<TypeTag, InferenceError> {
    let bin = payload.as_object().filter(|b| b.len() == 2).ok_or_else(|| {
        InferenceError::unrecognized("Binary", "expected {\"base64\": .., \"subType\": ..}")
    })?;
    let data = bin
        .get("base64")
        .ok_or_else(|| InferenceError::unrecognized("Binary", "missing base64"))?;
    let subtype = bin
        .get("subType")
        .ok_or_else(|| InferenceError::unrecognized("Binary", "missing subType"))?;
    check_base64(expect_str(TypeTag::Binary, data)?)?;
    check_subtype(expect_str(TypeTag::Binary, subtype)?)?;
    Ok(TypeTag::Binary)
}

fn check_regex_options(options: &str) -> Result<(), InferenceError> {
    if !REGEX_OPTIONS_REGEX.is_match(options) {
        return Err(InferenceError::unrecognized(
            "RegExp",
            format!("invalid options {options:?}"),
        ));
    }
    Ok(())
}

fn check_regular_expression(payload: &Value) -> Result<TypeTag, InferenceError> {
    let re = payload.as_object().filter(|r| r.len() == 2).ok_or_else(|| {
        InferenceError::unrecognized("RegExp", "expected {\"pattern\": .., \"options\": ..}")
    })?;
    match (re.get("pattern"), re.get("options")) {
        (Some(Value::String(_)), Some(Value::String(options))) => {
            check_regex_options(options)?;
            Ok(TypeTag::RegExp)
        }
        _ => Err(InferenceError::unrecognized(
            "RegExp",
            "pattern and options must be strings",
        )),
    }
}

fn check_key_bound(tag: TypeTag, payload: &Value) -> Result<TypeTag, InferenceError> {
    if payload.as_i64() != Some(1) {
        return Err(InferenceError::unrecognized(
            tag.name(),
            format!("expected 1, found {payload}"),
        ));
    }
    Ok(tag)
}

/// Numeric reading of a value already classified as `tag`
pub(crate) fn numeric_value(tag: TypeTag, value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => {
            let text = match tag {
                TypeTag::Long => map.get("$numberLong"),
                TypeTag::Number => map.get("$numberInt"),
                TypeTag::Double => map.get("$numberDouble").or_else(|| map.get("$numberDecimal")),
                _ => None,
            }?;
            text.as_str().and_then(parse_double)
        }
        _ => None,
    }
}

/// Instant of a value already classified as Date
pub(crate) fn date_value(value: &Value) -> Option<DateTime<Utc>> {
    value.get("$date").and_then(|payload| check_date(payload).ok())
}

/// A value whose type tags have all been resolved, down to the leaves.
///
/// Building this tree is the only fallible step of ingestion, so a document
/// that fails classification never touches the schema's counts.
#[derive(Debug)]
pub(crate) enum Observation<'a> {
    Scalar {
        tag: TypeTag,
        value: &'a Value,
    },
    Array {
        raw: &'a Value,
        items: Vec<Observation<'a>>,
    },
    Document {
        raw: &'a Value,
        members: Vec<(&'a str, Observation<'a>)>,
    },
}

impl<'a> Observation<'a> {
    pub(crate) fn tag(&self) -> TypeTag {
        match self {
            Observation::Scalar { tag, .. } => *tag,
            Observation::Array { .. } => TypeTag::Array,
            Observation::Document { .. } => TypeTag::Document,
        }
    }

    pub(crate) fn raw(&self) -> &'a Value {
        match self {
            Observation::Scalar { value, .. } => *value,
            Observation::Array { raw, .. } | Observation::Document { raw, .. } => *raw,
        }
    }
}

/// Classify `value` and everything nested inside it
pub(crate) fn observe(
    value: &Value,
    depth: usize,
    max_depth: usize,
) -> Result<Observation<'_>, InferenceError> {
    if depth > max_depth {
        return Err(InferenceError::MaxDepthExceeded {
            depth,
            max: max_depth,
        });
    }

    match (classify(value)?, value) {
        (TypeTag::Array, Value::Array(items)) => Ok(Observation::Array {
            raw: value,
            items: items
                .iter()
                .map(|item| observe(item, depth + 1, max_depth))
                .collect::<Result<_, InferenceError>>()?,
        }),
        (TypeTag::Document, Value::Object(map)) => Ok(Observation::Document {
            raw: value,
            members: map
                .iter()
                .map(|(key, member)| Ok((key.as_str(), observe(member, depth + 1, max_depth)?)))
                .collect::<Result<_, InferenceError>>()?,
        }),
        (tag, _) => Ok(Observation::Scalar { tag, value }),
    }
}

/// Lowercase JSON kind of a raw value, for error messages
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
