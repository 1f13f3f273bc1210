//! The create/update/delete plan computed by one reconciliation run.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::record::{Desired, Observed};

/// Whether the declared records should exist on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            _ => Err(format!("Unknown state: {s} (expected present or absent)")),
        }
    }
}

/// A matched pair whose desired values differ from the remote ones.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOp {
    pub desired: Desired,
    pub observed: Observed,
    /// Local names of the differing fields, in schema order.
    pub changed: IndexSet<String>,
}

impl UpdateOp {
    /// Local fields sent in the update payload, in schema order.
    ///
    /// Changed fields plus every required field, so the remote side always
    /// receives the keys it needs to identify and validate the record.
    pub fn payload_fields(&self) -> Vec<&str> {
        self.desired
            .spec()
            .iter()
            .filter(|(name, field)| field.required || self.changed.contains(*name))
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationSet {
    pub to_create: Vec<Desired>,
    pub to_update: Vec<UpdateOp>,
    pub to_delete: Vec<Observed>,
    /// Matched-but-changed pairs that were skipped, one message each.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl OperationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the run would not touch remote state.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }
}
