//! Classification of desired records against observed remote state.
//!
//! For every desired record the reconciler finds its match (if any) and
//! decides between create, update, delete and no-op. The decision itself
//! lives in [`Reconciler::plan`], which is pure and deterministic; only
//! [`Reconciler::reconcile`] talks to the remote API, and only to read.

use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::operations::{OperationSet, State, UpdateOp};
use crate::profile::ResourceProfile;
use crate::record::{Desired, Observed, TypedRecord, decode_observed};
use crate::remote::RemoteApi;
use crate::serializer::wire_value;

pub struct Reconciler<'a> {
    profile: &'a ResourceProfile,
}

impl<'a> Reconciler<'a> {
    pub fn new(profile: &'a ResourceProfile) -> Self {
        Self { profile }
    }

    /// Fetch and decode the current remote collection.
    pub async fn fetch_observed(&self, api: &dyn RemoteApi) -> Result<Vec<Observed>> {
        let path = &self.profile.endpoints().list;
        let payload = api.fetch(path).await?;
        let observed = decode_observed(payload, self.profile.envelope())?;
        debug!(
            profile = self.profile.name(),
            backend = api.backend_name(),
            records = observed.len(),
            "Fetched current state"
        );
        Ok(observed)
    }

    /// Fetch current state and plan the operations that converge it.
    pub async fn reconcile(
        &self,
        api: &dyn RemoteApi,
        desired: &[Desired],
        state: State,
    ) -> Result<OperationSet> {
        let observed = self.fetch_observed(api).await?;
        let ops = self.plan(desired, &observed, state)?;

        info!(
            profile = self.profile.name(),
            %state,
            create = ops.to_create.len(),
            update = ops.to_update.len(),
            delete = ops.to_delete.len(),
            skipped = ops.diagnostics.len(),
            "Reconciliation planned"
        );

        Ok(ops)
    }

    /// Classify `desired` against `observed`.
    ///
    /// An empty desired list with `State::Absent` deletes every observed
    /// record. Observed records nothing matched are otherwise left alone.
    pub fn plan(
        &self,
        desired: &[Desired],
        observed: &[Observed],
        state: State,
    ) -> Result<OperationSet> {
        let mut ops = OperationSet::new();

        if desired.is_empty() && state == State::Absent {
            debug!(records = observed.len(), "Empty config with state absent, deleting all");
            for record in observed {
                record.require_id()?;
                ops.to_delete.push(record.clone());
            }
            return Ok(ops);
        }

        let matcher = self.profile.matcher();
        let mut queued_deletes = HashSet::new();

        for record in desired {
            let found = matcher.find_match(record, observed);
            match (found, state) {
                (None, State::Present) => {
                    debug!(entry = record.index(), action = "create", "Classified config entry");
                    ops.to_create.push(record.clone());
                }
                (None, State::Absent) => {
                    debug!(entry = record.index(), action = "none", "No remote record to delete");
                }
                (Some(current), State::Absent) => {
                    let id = current.require_id()?;
                    debug!(
                        entry = record.index(),
                        action = "delete",
                        %id,
                        "Classified config entry"
                    );
                    if queued_deletes.insert(id) {
                        ops.to_delete.push(current.clone());
                    }
                }
                (Some(current), State::Present) => {
                    let changed = self.diff(record, current)?;
                    if changed.is_empty() {
                        debug!(entry = record.index(), action = "none", "Config entry up to date");
                    } else if !self.profile.supports_update() {
                        let message = self.unsupported(record, &changed);
                        warn!(entry = record.index(), "{message}");
                        ops.diagnostics.push(message);
                    } else {
                        current.require_id()?;
                        debug!(
                            entry = record.index(),
                            action = "update",
                            changed = ?changed,
                            "Classified config entry"
                        );
                        ops.to_update.push(UpdateOp {
                            desired: record.clone(),
                            observed: current.clone(),
                            changed,
                        });
                    }
                }
            }
        }

        Ok(ops)
    }

    /// Local fields whose wire value differs from the observed record.
    ///
    /// Unset desired fields never count as changed. Desired values are
    /// compared after the field map transform, so `830` and `"830"` are
    /// equal when the field is stringified on the way out.
    pub fn diff(&self, desired: &Desired, observed: &Observed) -> Result<IndexSet<String>> {
        let field_map = self.profile.field_map();
        let mut changed = IndexSet::new();

        for field in desired.fields() {
            if !desired.get(field).is_set() {
                continue;
            }
            let entry = field_map.lookup(field)?;
            let wanted = wire_value(desired, entry);
            let current = observed.get(&entry.remote).value();
            if wanted.as_ref() != current {
                changed.insert(field.to_string());
            }
        }

        Ok(changed)
    }

    fn unsupported(&self, desired: &Desired, changed: &IndexSet<String>) -> String {
        let identity = self.profile.identity().of_desired(desired);
        let fields = changed.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        format!(
            "{} {identity} differs in [{fields}] but {} cannot be updated, skipping",
            self.profile.identity().local,
            self.profile.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvergeError;
    use crate::field_map::{FieldMap, MapEntry, Transform};
    use crate::matcher::{Coercion, MatchRule, Matcher};
    use crate::profile::Endpoints;
    use crate::schema::{ConfigSpec, FieldSpec};
    use serde_json::{Value, json};

    fn profile(supports_update: bool) -> ResourceProfile {
        ResourceProfile::builder("netconf")
            .spec(
                ConfigSpec::new()
                    .field("port", FieldSpec::int().required())
                    .field("description", FieldSpec::str())
                    .field("comments", FieldSpec::str()),
            )
            .field_map(
                FieldMap::new([
                    MapEntry::new("port")
                        .to("netconfPort")
                        .with_transform(Transform::Stringify),
                    MapEntry::new("description"),
                    MapEntry::new("comments"),
                ])
                .unwrap(),
            )
            .matcher(Matcher::new([
                MatchRule::new("port", "netconfPort").with_coercion(Coercion::String)
            ]))
            .endpoints(Endpoints::collection("/api/netconf"))
            .supports_update(supports_update)
            .build()
            .unwrap()
    }

    fn observed(items: Value) -> Vec<Observed> {
        decode_observed(items, None).unwrap()
    }

    #[test]
    fn test_plan_create_when_unmatched() {
        let profile = profile(true);
        let desired = profile.desired(&[json!({"port": 830})]).unwrap();
        let ops = Reconciler::new(&profile)
            .plan(&desired, &[], State::Present)
            .unwrap();
        assert_eq!(ops.to_create.len(), 1);
        assert!(ops.to_update.is_empty() && ops.to_delete.is_empty());
    }

    #[test]
    fn test_plan_update_with_changed_fields() {
        let profile = profile(true);
        let desired = profile
            .desired(&[json!({"port": 830, "description": "x"})])
            .unwrap();
        let current = observed(json!([{"id": 1, "netconfPort": "830", "description": "old"}]));
        let ops = Reconciler::new(&profile)
            .plan(&desired, &current, State::Present)
            .unwrap();
        assert_eq!(ops.to_update.len(), 1);
        let changed: Vec<_> = ops.to_update[0].changed.iter().cloned().collect();
        assert_eq!(changed, vec!["description"]);
    }

    #[test]
    fn test_plan_noop_when_in_sync() {
        let profile = profile(true);
        let desired = profile
            .desired(&[json!({"port": 830, "description": "lab"})])
            .unwrap();
        let current = observed(json!([
            {"id": 1, "netconfPort": "830", "description": "lab", "comments": "left alone"}
        ]));
        let ops = Reconciler::new(&profile)
            .plan(&desired, &current, State::Present)
            .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_plan_absent_deletes_match_only() {
        let profile = profile(true);
        let desired = profile.desired(&[json!({"port": 830})]).unwrap();
        let current = observed(json!([
            {"id": 1, "netconfPort": "830"},
            {"id": 2, "netconfPort": "22"}
        ]));
        let ops = Reconciler::new(&profile)
            .plan(&desired, &current, State::Absent)
            .unwrap();
        assert_eq!(ops.to_delete.len(), 1);
        assert_eq!(ops.to_delete[0].id(), Some(&json!(1)));
    }

    #[test]
    fn test_plan_absent_without_match_is_noop() {
        let profile = profile(true);
        let desired = profile.desired(&[json!({"port": 443})]).unwrap();
        let current = observed(json!([{"id": 1, "netconfPort": "830"}]));
        let ops = Reconciler::new(&profile)
            .plan(&desired, &current, State::Absent)
            .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_plan_absent_deletes_each_record_once() {
        let profile = profile(true);
        let desired = profile
            .desired(&[json!({"port": 830}), json!({"port": "830"})])
            .unwrap();
        let current = observed(json!([{"id": 1, "netconfPort": "830"}]));
        let ops = Reconciler::new(&profile)
            .plan(&desired, &current, State::Absent)
            .unwrap();
        assert_eq!(ops.to_delete.len(), 1);
    }

    #[test]
    fn test_bulk_delete() {
        let profile = profile(true);
        let current = observed(json!([
            {"id": 1, "netconfPort": "830"},
            {"id": 2, "netconfPort": "22"}
        ]));
        let ops = Reconciler::new(&profile)
            .plan(&[], &current, State::Absent)
            .unwrap();
        assert_eq!(ops.to_delete.len(), 2);

        let ops = Reconciler::new(&profile)
            .plan(&[], &current, State::Present)
            .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_delete_requires_id() {
        let profile = profile(true);
        let current = observed(json!([{"netconfPort": "830"}]));
        let err = Reconciler::new(&profile)
            .plan(&[], &current, State::Absent)
            .unwrap_err();
        assert!(matches!(err, ConvergeError::Shape { .. }));
    }

    #[test]
    fn test_diff_ignores_unset_and_compares_wire_form() {
        let profile = profile(true);
        let reconciler = Reconciler::new(&profile);
        let desired = profile.desired(&[json!({"port": 830})]).unwrap();
        let current = &observed(json!([{"id": 1, "netconfPort": "830", "description": "old"}]))[0];
        assert!(reconciler.diff(&desired[0], current).unwrap().is_empty());

        let desired = profile
            .desired(&[json!({"port": 830, "comments": null})])
            .unwrap();
        let changed = reconciler.diff(&desired[0], current).unwrap();
        assert!(changed.contains("comments"));
    }

    #[test]
    fn test_unsupported_update_becomes_diagnostic() {
        let profile = profile(false);
        let desired = profile
            .desired(&[json!({"port": 830, "description": "x"})])
            .unwrap();
        let current = observed(json!([{"id": 1, "netconfPort": "830", "description": "old"}]));
        let ops = Reconciler::new(&profile)
            .plan(&desired, &current, State::Present)
            .unwrap();
        assert!(ops.is_empty());
        assert_eq!(ops.diagnostics.len(), 1);
        assert!(ops.diagnostics[0].contains("[description]"));
        assert!(ops.diagnostics[0].contains("netconf cannot be updated"));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let profile = profile(true);
        let reconciler = Reconciler::new(&profile);
        let desired = profile
            .desired(&[
                json!({"port": 830, "description": "x"}),
                json!({"port": 22}),
                json!({"port": 443, "comments": "new"}),
            ])
            .unwrap();
        let current = observed(json!([
            {"id": 1, "netconfPort": "830", "description": "old"},
            {"id": 2, "netconfPort": "22"}
        ]));

        let run = || {
            let ops = reconciler.plan(&desired, &current, State::Present).unwrap();
            serde_json::to_value(ops).unwrap()
        };
        assert_eq!(run(), run());
    }
}
