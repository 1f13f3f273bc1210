//! Rendering of typed records into the remote API's wire shape.
//!
//! Rendering is pure. Unset fields are omitted from the output entirely;
//! no null placeholders are emitted for them.

use serde_json::Value;

use crate::error::Result;
use crate::field_map::{FieldMap, MapEntry};
use crate::record::{RawRecord, Side, TypedRecord};

/// Wire value of one mapped field, or `None` when the field is unset.
///
/// Desired records are read by local name and transformed. Observed
/// records already hold wire values and are read by remote name.
pub(crate) fn wire_value<R: TypedRecord>(record: &R, entry: &MapEntry) -> Option<Value> {
    match R::SIDE {
        Side::Local => record
            .get(&entry.local)
            .value()
            .map(|value| entry.transform.apply(value)),
        Side::Remote => record.get(&entry.remote).value().cloned(),
    }
}

/// Render every mapped field of `record`.
pub fn render<R: TypedRecord>(record: &R, field_map: &FieldMap) -> RawRecord {
    field_map
        .entries()
        .filter_map(|entry| wire_value(record, entry).map(|value| (entry.remote.clone(), value)))
        .collect()
}

pub fn render_batch<R: TypedRecord>(records: &[R], field_map: &FieldMap) -> Vec<RawRecord> {
    records
        .iter()
        .map(|record| render(record, field_map))
        .collect()
}

/// Render only the named local fields, in the order given.
///
/// Fails with `UnknownField` when a name has no map entry.
pub fn render_fields<'a, R, I>(record: &R, field_map: &FieldMap, fields: I) -> Result<RawRecord>
where
    R: TypedRecord,
    I: IntoIterator<Item = &'a str>,
{
    let mut out = RawRecord::new();
    for field in fields {
        let entry = field_map.lookup(field)?;
        if let Some(value) = wire_value(record, entry) {
            out.insert(entry.remote.clone(), value);
        }
    }
    Ok(out)
}
