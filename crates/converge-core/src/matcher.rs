//! Pairing of desired records with the observed records they describe.
//!
//! Matching is a conjunction of equality rules. When several observed
//! records satisfy every rule, the earliest one in fetch order is the
//! match; the others are left alone.

use serde_json::Value;

use crate::record::{Desired, Observed, TypedRecord};

/// Explicit normalization applied to both sides of a rule before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    /// Strict JSON equality.
    #[default]
    None,
    /// Compare scalars by their string form, e.g. `830` equals `"830"`.
    String,
    /// Compare numeric strings as integers.
    Integer,
}

impl Coercion {
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Self::None, _) => value.clone(),
            (Self::String, Value::Number(n)) => Value::String(n.to_string()),
            (Self::String, Value::Bool(b)) => Value::String(b.to_string()),
            (Self::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        }
    }
}

/// `desired.local == observed.remote` after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    pub local: String,
    pub remote: String,
    pub coercion: Coercion,
}

impl MatchRule {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
            coercion: Coercion::None,
        }
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    /// Unset and null values never satisfy a rule.
    pub fn is_satisfied(&self, desired: &Desired, observed: &Observed) -> bool {
        let (Some(local), Some(remote)) = (
            desired.get(&self.local).value(),
            observed.get(&self.remote).value(),
        ) else {
            return false;
        };
        if local.is_null() || remote.is_null() {
            return false;
        }
        self.coercion.apply(local) == self.coercion.apply(remote)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    rules: Vec<MatchRule>,
}

impl Matcher {
    pub fn new(rules: impl IntoIterator<Item = MatchRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Conjunction of every rule. A matcher without rules matches nothing.
    pub fn matches(&self, desired: &Desired, observed: &Observed) -> bool {
        !self.rules.is_empty()
            && self
                .rules
                .iter()
                .all(|rule| rule.is_satisfied(desired, observed))
    }

    /// First observed record, in list order, that matches `desired`.
    pub fn find_match<'a>(
        &self,
        desired: &Desired,
        observed: &'a [Observed],
    ) -> Option<&'a Observed> {
        let position = observed
            .iter()
            .position(|candidate| self.matches(desired, candidate))?;

        let extra = observed[position + 1..]
            .iter()
            .filter(|candidate| self.matches(desired, candidate))
            .count();
        if extra > 0 {
            tracing::warn!(
                entry = desired.index(),
                candidates = extra + 1,
                "Several remote records match one config entry, using the first"
            );
        }

        Some(&observed[position])
    }
}
