//! Typed, read-only views over raw API and config records.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ConvergeError, Result, SchemaError};
use crate::schema::{ConfigSpec, json_type_name};

/// Transport-level unit exchanged with the remote API.
pub type RawRecord = Map<String, Value>;

/// Name of the identity field every observed record is addressed by.
pub const ID_FIELD: &str = "id";

const REDACTED: &str = "********";

/// Result of reading one field from a typed record.
///
/// `Unset` means the key is absent; a present JSON `null` is `Value(Null)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Unset,
    Value(&'a Value),
}

impl<'a> Field<'a> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Self::Unset => None,
            Self::Value(value) => Some(value),
        }
    }
}

impl<'a> From<Option<&'a Value>> for Field<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        value.map_or(Self::Unset, Self::Value)
    }
}

/// Which naming convention a record's keys follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Keys are local (desired-config) field names.
    Local,
    /// Keys are remote (API) field names.
    Remote,
}

/// Read-only attribute access over a raw record.
pub trait TypedRecord {
    /// Naming convention of this record's keys.
    const SIDE: Side;

    fn get(&self, field: &str) -> Field<'_>;

    /// Declared schema for desired records, keys present for observed ones.
    fn fields(&self) -> Vec<&str>;

    fn raw(&self) -> &RawRecord;
}

/// A caller-supplied target configuration for one resource instance.
#[derive(Clone)]
pub struct Desired {
    index: usize,
    spec: Arc<ConfigSpec>,
    record: RawRecord,
}

impl Desired {
    /// Validate `raw` against `spec` and wrap the normalized result.
    ///
    /// `index` is the record's position in the caller's list and is only
    /// used for error messages.
    pub fn new(
        spec: Arc<ConfigSpec>,
        index: usize,
        raw: &Value,
    ) -> std::result::Result<Self, SchemaError> {
        let record = spec.validate(index, raw)?;
        Ok(Self {
            index,
            spec,
            record,
        })
    }

    /// Validate a whole list; the first invalid entry aborts.
    pub fn from_list(
        spec: &Arc<ConfigSpec>,
        raw: &[Value],
    ) -> std::result::Result<Vec<Self>, SchemaError> {
        raw.iter()
            .enumerate()
            .map(|(index, value)| Self::new(Arc::clone(spec), index, value))
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &ConfigSpec {
        &self.spec
    }

    /// The record with secret field values masked, for logs and reports.
    pub fn redacted(&self) -> RawRecord {
        self.record
            .iter()
            .map(|(key, value)| {
                if self.spec.is_secret(key) {
                    (key.clone(), Value::String(REDACTED.to_string()))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

impl TypedRecord for Desired {
    const SIDE: Side = Side::Local;

    fn get(&self, field: &str) -> Field<'_> {
        self.record.get(field).into()
    }

    fn fields(&self) -> Vec<&str> {
        self.spec.names().collect()
    }

    fn raw(&self) -> &RawRecord {
        &self.record
    }
}

impl fmt::Debug for Desired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Desired")
            .field("index", &self.index)
            .field("record", &self.redacted())
            .finish()
    }
}

impl Serialize for Desired {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.redacted().serialize(serializer)
    }
}

/// The remote API's current-state representation of one resource instance.
#[derive(Debug, Clone)]
pub struct Observed {
    record: RawRecord,
}

impl Observed {
    pub fn new(record: RawRecord) -> Self {
        Self { record }
    }

    /// Identity used to address the record for deletes and updates.
    pub fn id(&self) -> Option<&Value> {
        self.record.get(ID_FIELD).filter(|id| !id.is_null())
    }

    /// Identity rendered for use in a URL path segment.
    pub fn id_segment(&self) -> Option<String> {
        self.id().map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// [`Observed::id_segment`] for records about to be addressed by id.
    pub(crate) fn require_id(&self) -> Result<String> {
        self.id_segment()
            .ok_or_else(|| ConvergeError::shape("matched remote record has no 'id' field"))
    }
}

impl TypedRecord for Observed {
    const SIDE: Side = Side::Remote;

    fn get(&self, field: &str) -> Field<'_> {
        self.record.get(field).into()
    }

    fn fields(&self) -> Vec<&str> {
        self.record.keys().map(String::as_str).collect()
    }

    fn raw(&self) -> &RawRecord {
        &self.record
    }
}

impl Serialize for Observed {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

/// Decode a fetched payload into observed records.
///
/// The payload must be a mapping or a sequence. With an `envelope`, a
/// mapping must carry that key and is unwrapped first; without one, a
/// mapping is a single record. Every element of a sequence must itself be
/// a mapping.
pub fn decode_observed(payload: Value, envelope: Option<&str>) -> Result<Vec<Observed>> {
    match (payload, envelope) {
        (Value::Object(mut map), Some(key)) => match map.remove(key) {
            Some(inner @ (Value::Array(_) | Value::Object(_))) => decode_observed(inner, None),
            Some(other) => Err(ConvergeError::shape(format!(
                "envelope '{key}' holds {}, expected a mapping or a sequence",
                json_type_name(&other)
            ))),
            None => Err(ConvergeError::shape(format!("missing envelope '{key}'"))),
        },
        (Value::Object(map), None) => Ok(vec![Observed::new(map)]),
        (payload, _) => decode_sequence(payload),
    }
}

fn decode_sequence(payload: Value) -> Result<Vec<Observed>> {
    match payload {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(Observed::new(map)),
                other => Err(ConvergeError::shape(format!(
                    "element {i} is {}, expected a mapping",
                    json_type_name(&other)
                ))),
            })
            .collect(),
        other => Err(ConvergeError::shape(format!(
            "got {}, expected a mapping or a sequence",
            json_type_name(&other)
        ))),
    }
}
