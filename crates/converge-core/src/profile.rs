//! Everything the engine needs to know about one resource type.
//!
//! A [`ResourceProfile`] bundles the declared schema, the field map, the
//! match rules, the API endpoints and the capabilities of a resource type.
//! Profiles are validated once when built and are read-only afterwards.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ConvergeError, Result, SchemaError};
use crate::field_map::FieldMap;
use crate::matcher::{Coercion, Matcher};
use crate::record::{Desired, Observed, TypedRecord};
use crate::schema::ConfigSpec;

/// Placeholder substituted with a record's identity in item paths.
pub const ID_PLACEHOLDER: &str = "{id}";

/// How create and update payloads are submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// One request per record.
    #[default]
    PerRecord,
    /// One request per category carrying an array of payloads.
    Batch,
}

/// Where an update request carries the identity of the record it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateAddressing {
    /// `{id}` in the update path.
    #[default]
    Path,
    /// An `id` field inserted into each payload.
    Body,
}

/// API paths of a resource collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub list: String,
    pub create: String,
    pub update: String,
    /// Must contain `{id}`.
    pub delete: String,
}

impl Endpoints {
    /// Collection served at one path, items at `{path}/{id}`.
    pub fn collection(path: impl Into<String>) -> Self {
        let path = path.into();
        let item = format!("{}/{ID_PLACEHOLDER}", path.trim_end_matches('/'));
        Self {
            list: path.clone(),
            create: path,
            update: item.clone(),
            delete: item,
        }
    }

    pub fn item_path(template: &str, id: &str) -> String {
        template.replace(ID_PLACEHOLDER, id)
    }
}

/// Field pair used to name records in the change report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub local: String,
    pub remote: String,
    /// Applied to the remote value so both sides report alike.
    pub coercion: Coercion,
}

impl Identity {
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

    pub fn of_desired(&self, desired: &Desired) -> Value {
        desired
            .get(&self.local)
            .value()
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn of_observed(&self, observed: &Observed) -> Value {
        observed
            .get(&self.remote)
            .value()
            .map(|value| self.coercion.apply(value))
            .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct ResourceProfile {
    name: String,
    spec: Arc<ConfigSpec>,
    field_map: FieldMap,
    matcher: Matcher,
    endpoints: Endpoints,
    envelope: Option<String>,
    identity: Identity,
    write_mode: WriteMode,
    update_addressing: UpdateAddressing,
    supports_update: bool,
}

impl ResourceProfile {
    pub fn builder(name: impl Into<String>) -> ProfileBuilder {
        ProfileBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &Arc<ConfigSpec> {
        &self.spec
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Key under which the list endpoint wraps its records, if any.
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn update_addressing(&self) -> UpdateAddressing {
        self.update_addressing
    }

    pub fn supports_update(&self) -> bool {
        self.supports_update
    }

    /// Validate raw caller input into desired records.
    pub fn desired(&self, raw: &[Value]) -> std::result::Result<Vec<Desired>, SchemaError> {
        Desired::from_list(&self.spec, raw)
    }
}

/// Builder for [`ResourceProfile`]; `build` checks internal consistency.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    name: String,
    spec: ConfigSpec,
    field_map: FieldMap,
    matcher: Matcher,
    endpoints: Option<Endpoints>,
    envelope: Option<String>,
    identity: Option<Identity>,
    write_mode: WriteMode,
    update_addressing: UpdateAddressing,
    supports_update: bool,
}

impl ProfileBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: ConfigSpec::new(),
            field_map: FieldMap::default(),
            matcher: Matcher::default(),
            endpoints: None,
            envelope: None,
            identity: None,
            write_mode: WriteMode::default(),
            update_addressing: UpdateAddressing::default(),
            supports_update: true,
        }
    }

    pub fn spec(mut self, spec: ConfigSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn envelope(mut self, key: impl Into<String>) -> Self {
        self.envelope = Some(key.into());
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn update_addressing(mut self, addressing: UpdateAddressing) -> Self {
        self.update_addressing = addressing;
        self
    }

    pub fn supports_update(mut self, supported: bool) -> Self {
        self.supports_update = supported;
        self
    }

    pub fn build(self) -> Result<ResourceProfile> {
        let invalid = |message: String| ConvergeError::profile(&self.name, message);

        if self.spec.is_empty() {
            return Err(invalid("no fields declared".into()));
        }
        if let Some(field) = self.spec.names().find(|f| !self.field_map.contains(f)) {
            return Err(invalid(format!("field '{field}' has no mapping")));
        }
        if let Some(entry) = self.field_map.entries().find(|e| !self.spec.contains(&e.local)) {
            return Err(invalid(format!("mapping for undeclared field '{}'", entry.local)));
        }
        if self.matcher.rules().is_empty() {
            return Err(invalid("no match rules".into()));
        }
        if let Some(rule) = self.matcher.rules().iter().find(|r| !self.spec.contains(&r.local)) {
            return Err(invalid(format!("match rule on undeclared field '{}'", rule.local)));
        }

        let endpoints = self
            .endpoints
            .clone()
            .ok_or_else(|| invalid("no endpoints".into()))?;
        if !endpoints.delete.contains(ID_PLACEHOLDER) {
            return Err(invalid(format!("delete path must contain {ID_PLACEHOLDER}")));
        }
        if self.supports_update
            && self.update_addressing == UpdateAddressing::Path
            && !endpoints.update.contains(ID_PLACEHOLDER)
        {
            return Err(invalid(format!("update path must contain {ID_PLACEHOLDER}")));
        }
        if self.supports_update
            && self.write_mode == WriteMode::Batch
            && self.update_addressing == UpdateAddressing::Path
        {
            return Err(invalid("batched updates must carry ids in the body".into()));
        }

        let identity = match self.identity.clone() {
            Some(identity) => identity,
            None => {
                let rule = &self.matcher.rules()[0];
                Identity::new(rule.local.clone(), rule.remote.clone())
            }
        };
        if !self.spec.contains(&identity.local) {
            return Err(invalid(format!("identity field '{}' is not declared", identity.local)));
        }

        Ok(ResourceProfile {
            name: self.name,
            spec: Arc::new(self.spec),
            field_map: self.field_map,
            matcher: self.matcher,
            endpoints,
            envelope: self.envelope,
            identity,
            write_mode: self.write_mode,
            update_addressing: self.update_addressing,
            supports_update: self.supports_update,
        })
    }
}
