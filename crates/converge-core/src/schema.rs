//! Declared field schema for desired records.
//!
//! A [`ConfigSpec`] lists every field a desired record may carry, in
//! declaration order. Validation is strict: keys outside the declared
//! schema are rejected.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::error::SchemaError;
use crate::record::RawRecord;

/// Primitive type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    #[default]
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
    /// Any JSON value, passed through untouched.
    Raw,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Raw => "raw",
        }
    }

    /// Coerce `value` into this type, or return `None` when it cannot be.
    ///
    /// Coercion is deliberately narrow: numeric strings become numbers,
    /// scalars become strings, comma separated strings become lists.
    fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) | (Self::Raw, _) => Some(value.clone()),
            (Self::Str, Value::String(_)) => Some(value.clone()),
            (Self::Str, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Self::Str, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Self::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
            (Self::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Float, Value::Number(_)) => Some(value.clone()),
            (Self::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            (Self::Bool, Value::Bool(_)) => Some(value.clone()),
            (Self::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (Self::List, Value::Array(_)) => Some(value.clone()),
            (Self::List, Value::String(s)) => Some(Value::Array(
                s.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            )),
            (Self::Dict, Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a single field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpec {
    pub kind: FieldType,
    pub required: bool,
    pub choices: Option<Vec<Value>>,
    pub default: Option<Value>,
    /// Values of secret fields are never written to logs.
    pub secret: bool,
}

impl FieldSpec {
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn str() -> Self {
        Self::new(FieldType::Str)
    }

    pub fn int() -> Self {
        Self::new(FieldType::Int)
    }

    pub fn bool() -> Self {
        Self::new(FieldType::Bool)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Ordered set of field declarations for one resource type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSpec {
    fields: IndexMap<String, FieldSpec>,
}

impl ConfigSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Re-declaring a name replaces the earlier declaration.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name)
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.get(name).is_some_and(|spec| spec.secret)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate and normalize one raw desired record.
    ///
    /// Returns the normalized record: values coerced to their declared type
    /// and defaults filled in for absent fields. A present `null` is kept as
    /// is for optional fields; for required fields it counts as missing.
    pub fn validate(&self, index: usize, raw: &Value) -> Result<RawRecord, SchemaError> {
        let Value::Object(input) = raw else {
            return Err(SchemaError::NotAMapping {
                index,
                found: json_type_name(raw).to_string(),
            });
        };

        if let Some(unknown) = input.keys().find(|key| !self.contains(key)) {
            return Err(SchemaError::UnknownField {
                index,
                field: unknown.clone(),
            });
        }

        let mut normalized = Map::new();
        for (name, spec) in self.iter() {
            let value = match input.get(name) {
                Some(value) => Some(value),
                None => spec.default.as_ref(),
            };

            let Some(value) = value else {
                if spec.required {
                    return Err(SchemaError::MissingRequired {
                        index,
                        field: name.to_string(),
                    });
                }
                continue;
            };

            if value.is_null() && spec.required {
                return Err(SchemaError::MissingRequired {
                    index,
                    field: name.to_string(),
                });
            }

            let coerced = spec
                .kind
                .coerce(value)
                .ok_or_else(|| SchemaError::TypeMismatch {
                    index,
                    field: name.to_string(),
                    expected: spec.kind.to_string(),
                    found: json_type_name(value).to_string(),
                })?;

            if let Some(choices) = &spec.choices
                && !coerced.is_null()
                && !choices.contains(&coerced)
            {
                return Err(SchemaError::InvalidChoice {
                    index,
                    field: name.to_string(),
                    value: display_value(&coerced),
                    choices: choices
                        .iter()
                        .map(display_value)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }

            normalized.insert(name.to_string(), coerced);
        }

        Ok(normalized)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
