//! In-memory [`RemoteApi`] backend.
//!
//! Holds one record collection, applies POST/PUT/DELETE to it and records
//! every call it receives. Failures can be injected for the n-th call of a
//! given verb, which makes partial runs reproducible.
//!
//! # Example
//!
//! ```ignore
//! use converge_core::{InMemoryInventory, RemoteApi};
//! use serde_json::json;
//!
//! let api = InMemoryInventory::new()
//!     .with_envelope("response")
//!     .with_records([json!({"id": "1", "netconfPort": "830"})]);
//! let payload = api.fetch("/any").await?;
//! assert_eq!(payload["response"][0]["netconfPort"], "830");
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::TransportError;
use crate::record::{ID_FIELD, RawRecord};
use crate::remote::{RemoteApi, Verb};

/// One call received by [`InMemoryInventory`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub verb: Verb,
    pub path: String,
    pub payload: Option<Value>,
}

#[derive(Debug)]
struct Injected {
    verb: Verb,
    nth: usize,
    error: TransportError,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<RawRecord>,
    calls: Vec<RecordedCall>,
    counts: HashMap<Verb, usize>,
    failures: Vec<Injected>,
}

#[derive(Debug, Default)]
pub struct InMemoryInventory {
    envelope: Option<String>,
    inner: Mutex<Inner>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap fetched records under `key`, e.g. `{"response": [...]}`.
    pub fn with_envelope(mut self, key: impl Into<String>) -> Self {
        self.envelope = Some(key.into());
        self
    }

    /// Seed the collection. Non-object values are ignored.
    pub fn with_records(self, records: impl IntoIterator<Item = Value>) -> Self {
        self.lock().records.extend(records.into_iter().filter_map(|record| match record {
            Value::Object(map) => Some(map),
            _ => None,
        }));
        self
    }

    /// Fail the `nth` (1-based) call made with `verb`. The failing call
    /// leaves the collection untouched.
    pub fn fail_on(self, verb: Verb, nth: usize, error: TransportError) -> Self {
        self.lock().failures.push(Injected { verb, nth, error });
        self
    }

    /// Current collection, in insertion order.
    pub fn records(&self) -> Vec<Value> {
        self.lock()
            .records
            .iter()
            .cloned()
            .map(Value::Object)
            .collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of calls that could have changed the collection.
    pub fn mutation_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.verb.is_mutating())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listing(&self, records: &[RawRecord]) -> Value {
        let items = Value::Array(records.iter().cloned().map(Value::Object).collect());
        match &self.envelope {
            Some(key) => {
                let mut wrapped = RawRecord::new();
                wrapped.insert(key.clone(), items);
                Value::Object(wrapped)
            }
            None => items,
        }
    }
}

impl Inner {
    fn begin(
        &mut self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<(), TransportError> {
        self.calls.push(RecordedCall {
            verb,
            path: path.to_string(),
            payload: payload.cloned(),
        });
        let count = self.counts.entry(verb).or_default();
        *count += 1;
        let nth = *count;

        match self
            .failures
            .iter()
            .position(|failure| failure.verb == verb && failure.nth == nth)
        {
            Some(position) => Err(self.failures.remove(position).error),
            None => Ok(()),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.get(ID_FIELD).map(segment).as_deref() == Some(id))
    }

    fn create(&mut self, mut record: RawRecord) -> Value {
        if !record.get(ID_FIELD).is_some_and(|id| !id.is_null()) {
            record.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        self.records.push(record.clone());
        Value::Object(record)
    }

    fn update(&mut self, patch: RawRecord, path: &str) -> Result<Value, TransportError> {
        let id = patch
            .get(ID_FIELD)
            .map(segment)
            .unwrap_or_else(|| last_segment(path).to_string());
        let position = self
            .position(&id)
            .ok_or_else(|| TransportError::status(404, format!("no record with id {id}")))?;
        let record = &mut self.records[position];
        record.extend(patch);
        Ok(Value::Object(record.clone()))
    }

    fn delete(&mut self, path: &str) -> Result<Value, TransportError> {
        let id = last_segment(path);
        let position = self
            .position(id)
            .ok_or_else(|| TransportError::status(404, format!("no record with id {id}")))?;
        Ok(Value::Object(self.records.remove(position)))
    }
}

#[async_trait]
impl RemoteApi for InMemoryInventory {
    async fn fetch(&self, path: &str) -> Result<Value, TransportError> {
        let mut inner = self.lock();
        inner.begin(Verb::Get, path, None)?;
        Ok(self.listing(&inner.records))
    }

    async fn send(
        &self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let mut inner = self.lock();
        inner.begin(verb, path, payload)?;

        match verb {
            Verb::Get => Ok(self.listing(&inner.records)),
            Verb::Delete => inner.delete(path),
            Verb::Post => match records_of(payload)? {
                Batch::One(record) => Ok(inner.create(record)),
                Batch::Many(records) => Ok(Value::Array(
                    records.into_iter().map(|record| inner.create(record)).collect(),
                )),
            },
            Verb::Put => match records_of(payload)? {
                Batch::One(record) => inner.update(record, path),
                Batch::Many(records) => records
                    .into_iter()
                    .map(|record| inner.update(record, path))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
            },
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

enum Batch {
    One(RawRecord),
    Many(Vec<RawRecord>),
}

fn records_of(payload: Option<&Value>) -> Result<Batch, TransportError> {
    let bad_request =
        || TransportError::status(400, "payload must be an object or an array of objects");
    match payload {
        Some(Value::Object(record)) => Ok(Batch::One(record.clone())),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_object().cloned().ok_or_else(bad_request))
            .collect::<Result<Vec<_>, _>>()
            .map(Batch::Many),
        _ => Err(bad_request()),
    }
}

fn segment(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn last_segment(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    path.rsplit('/').next().unwrap_or(path)
}
