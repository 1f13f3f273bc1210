//! Translation table between local (config) and remote (API) field names.
//!
//! Every local/remote field translation goes through a [`FieldMap`]; no
//! other part of the engine builds remote field names on its own.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ConvergeError, Result};
use crate::record::{ID_FIELD, Observed, RawRecord, TypedRecord};
use crate::serializer;

/// Per-field value transform applied when a local value is sent to the API.
#[derive(Clone, Copy, Default)]
pub enum Transform {
    #[default]
    Identity,
    /// Scalars become their string form, e.g. `830` -> `"830"`.
    Stringify,
    /// Numeric strings become integers, e.g. `"830"` -> `830`.
    Integer,
    /// Wrap a scalar in a one-element list; lists pass through.
    WrapList,
    Custom(fn(&Value) -> Value),
}

impl Transform {
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Self::Identity, _) | (_, Value::Null) => value.clone(),
            (Self::Stringify, Value::String(_)) => value.clone(),
            (Self::Stringify, other) => Value::String(other.to_string()),
            (Self::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| value.clone()),
            (Self::Integer, _) => value.clone(),
            (Self::WrapList, Value::Array(_)) => value.clone(),
            (Self::WrapList, other) => Value::Array(vec![other.clone()]),
            (Self::Custom(f), other) => f(other),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::Stringify => write!(f, "Stringify"),
            Self::Integer => write!(f, "Integer"),
            Self::WrapList => write!(f, "WrapList"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// One mapping entry: `local` is sent to the API as `remote`.
#[derive(Debug, Clone)]
pub struct MapEntry {
    pub local: String,
    pub remote: String,
    pub transform: Transform,
}

impl MapEntry {
    /// Entry whose remote name equals the local name.
    pub fn new(local: impl Into<String>) -> Self {
        let local = local.into();
        Self {
            remote: local.clone(),
            local,
            transform: Transform::Identity,
        }
    }

    pub fn to(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Ordered, read-only set of [`MapEntry`] values keyed by local name.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: IndexMap<String, MapEntry>,
}

impl FieldMap {
    /// Build a map; local field names must be unique.
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = MapEntry>,
    {
        let mut map = IndexMap::new();
        for entry in entries {
            if map.contains_key(&entry.local) {
                return Err(ConvergeError::DuplicateField { field: entry.local });
            }
            map.insert(entry.local.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    pub fn lookup(&self, local: &str) -> Result<&MapEntry> {
        self.entries
            .get(local)
            .ok_or_else(|| ConvergeError::unknown_field(local))
    }

    /// Reverse lookup by remote field name. The first matching entry wins.
    pub fn lookup_remote(&self, remote: &str) -> Option<&MapEntry> {
        self.entries.values().find(|entry| entry.remote == remote)
    }

    pub fn contains(&self, local: &str) -> bool {
        self.entries.contains_key(local)
    }

    pub fn entries(&self) -> impl Iterator<Item = &MapEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render `record` into the API's wire shape. See [`serializer::render`].
    pub fn render<R: TypedRecord>(&self, record: &R) -> RawRecord {
        serializer::render(record, self)
    }

    /// Present an observed record under local field names.
    ///
    /// Mapped fields are renamed; the identity field is kept; everything
    /// else the API returned is dropped. Values stay in wire form.
    pub fn localize(&self, observed: &Observed) -> RawRecord {
        let mut out = RawRecord::new();
        if let Some(id) = observed.id() {
            out.insert(ID_FIELD.to_string(), id.clone());
        }
        for (remote, value) in observed.raw() {
            if let Some(entry) = self.lookup_remote(remote) {
                out.insert(entry.local.clone(), value.clone());
            }
        }
        out
    }
}
