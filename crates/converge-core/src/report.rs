//! Structured summary of what a run changed, or would change under dry-run.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Identifiers of updated records, or a marker when the resource type
/// cannot be updated at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Modified {
    Tracked(Vec<Value>),
    Unsupported,
}

impl Default for Modified {
    fn default() -> Self {
        Self::Tracked(Vec::new())
    }
}

impl Modified {
    pub fn items(&self) -> &[Value] {
        match self {
            Self::Tracked(items) => items,
            Self::Unsupported => &[],
        }
    }
}

impl Serialize for Modified {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Tracked(items) => items.serialize(serializer),
            Self::Unsupported => serializer.serialize_str("unsupported"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeReport {
    pub changed: bool,
    pub added: Vec<Value>,
    pub removed: Vec<Value>,
    pub modified: Modified,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ChangeReport {
    /// Empty report. `supports_update` selects how `modified` is reported.
    pub fn new(supports_update: bool) -> Self {
        Self {
            modified: if supports_update {
                Modified::default()
            } else {
                Modified::Unsupported
            },
            ..Self::default()
        }
    }

    pub fn record_added(&mut self, id: Value) {
        self.changed = true;
        self.added.push(id);
    }

    pub fn record_removed(&mut self, id: Value) {
        self.changed = true;
        self.removed.push(id);
    }

    pub fn record_modified(&mut self, id: Value) {
        if let Modified::Tracked(items) = &mut self.modified {
            self.changed = true;
            items.push(id);
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
