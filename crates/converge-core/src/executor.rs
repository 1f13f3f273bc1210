//! Drives an [`OperationSet`] against the remote API.
//!
//! Creates run first, then updates, then deletes. The first failing call
//! stops the run; the error carries the report of everything applied
//! before it. Under dry-run the same report is produced without a single
//! mutating call.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConvergeError, OperationKind, Result, TransportError};
use crate::operations::{OperationSet, UpdateOp};
use crate::profile::{Endpoints, ResourceProfile, UpdateAddressing, WriteMode};
use crate::record::{Desired, ID_FIELD, Observed, RawRecord};
use crate::remote::{RemoteApi, Verb};
use crate::report::ChangeReport;
use crate::serializer::{render, render_fields};

pub struct Executor<'a> {
    profile: &'a ResourceProfile,
    api: &'a dyn RemoteApi,
}

impl<'a> Executor<'a> {
    pub fn new(profile: &'a ResourceProfile, api: &'a dyn RemoteApi) -> Self {
        Self { profile, api }
    }

    pub async fn execute(&self, ops: &OperationSet, dry_run: bool) -> Result<ChangeReport> {
        let mut report = ChangeReport::new(self.profile.supports_update());
        for diagnostic in &ops.diagnostics {
            report.warn(diagnostic.clone());
        }

        self.create(&ops.to_create, dry_run, &mut report).await?;
        self.update(&ops.to_update, dry_run, &mut report).await?;
        self.delete(&ops.to_delete, dry_run, &mut report).await?;

        info!(
            profile = self.profile.name(),
            backend = self.api.backend_name(),
            dry_run,
            created = report.added.len(),
            updated = report.modified.items().len(),
            deleted = report.removed.len(),
            "Changes applied"
        );

        Ok(report)
    }

    async fn create(
        &self,
        records: &[Desired],
        dry_run: bool,
        report: &mut ChangeReport,
    ) -> Result<()> {
        let identity = self.profile.identity();
        if dry_run || records.is_empty() {
            records
                .iter()
                .for_each(|record| report.record_added(identity.of_desired(record)));
            return Ok(());
        }

        let path = &self.profile.endpoints().create;
        let field_map = self.profile.field_map();
        match self.profile.write_mode() {
            WriteMode::Batch => {
                let payload = Value::Array(
                    records
                        .iter()
                        .map(|record| Value::Object(render(record, field_map)))
                        .collect(),
                );
                self.call(OperationKind::Create, Verb::Post, path, Some(&payload), report)
                    .await?;
                records
                    .iter()
                    .for_each(|record| report.record_added(identity.of_desired(record)));
            }
            WriteMode::PerRecord => {
                for record in records {
                    let payload = Value::Object(render(record, field_map));
                    self.call(OperationKind::Create, Verb::Post, path, Some(&payload), report)
                        .await?;
                    report.record_added(identity.of_desired(record));
                }
            }
        }
        Ok(())
    }

    async fn update(
        &self,
        updates: &[UpdateOp],
        dry_run: bool,
        report: &mut ChangeReport,
    ) -> Result<()> {
        let identity = self.profile.identity();
        if dry_run || updates.is_empty() {
            updates
                .iter()
                .for_each(|op| report.record_modified(identity.of_desired(&op.desired)));
            return Ok(());
        }

        let endpoints = self.profile.endpoints();
        match self.profile.write_mode() {
            WriteMode::Batch => {
                let payload = updates
                    .iter()
                    .map(|op| self.update_payload(op).map(Value::Object))
                    .collect::<Result<Vec<_>>>()?;
                let payload = Value::Array(payload);
                let path = &endpoints.update;
                self.call(OperationKind::Update, Verb::Put, path, Some(&payload), report)
                    .await?;
                updates
                    .iter()
                    .for_each(|op| report.record_modified(identity.of_desired(&op.desired)));
            }
            WriteMode::PerRecord => {
                for op in updates {
                    let payload = Value::Object(self.update_payload(op)?);
                    let path = match self.profile.update_addressing() {
                        UpdateAddressing::Path => {
                            Endpoints::item_path(&endpoints.update, &op.observed.require_id()?)
                        }
                        UpdateAddressing::Body => endpoints.update.clone(),
                    };
                    self.call(OperationKind::Update, Verb::Put, &path, Some(&payload), report)
                        .await?;
                    report.record_modified(identity.of_desired(&op.desired));
                }
            }
        }
        Ok(())
    }

    async fn delete(
        &self,
        records: &[Observed],
        dry_run: bool,
        report: &mut ChangeReport,
    ) -> Result<()> {
        let identity = self.profile.identity();
        for record in records {
            if !dry_run {
                let template = &self.profile.endpoints().delete;
                let path = Endpoints::item_path(template, &record.require_id()?);
                self.call(OperationKind::Delete, Verb::Delete, &path, None, report)
                    .await?;
            }
            report.record_removed(identity.of_observed(record));
        }
        Ok(())
    }

    /// Changed and required fields in wire form, plus the id when the
    /// profile addresses updates through the body.
    fn update_payload(&self, op: &UpdateOp) -> Result<RawRecord> {
        let field_map = self.profile.field_map();
        let mut payload = render_fields(&op.desired, field_map, op.payload_fields())?;
        if self.profile.update_addressing() == UpdateAddressing::Body {
            let id = op
                .observed
                .id()
                .ok_or_else(|| ConvergeError::shape("updated remote record has no 'id' field"))?;
            payload.insert(ID_FIELD.to_string(), id.clone());
        }
        Ok(payload)
    }

    async fn call(
        &self,
        operation: OperationKind,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
        report: &ChangeReport,
    ) -> Result<Value> {
        debug!(%verb, path, "Sending {operation}");
        self.api
            .send(verb, path, payload)
            .await
            .map_err(|source: TransportError| {
                ConvergeError::remote_operation(operation, source, report.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_map::{FieldMap, MapEntry, Transform};
    use crate::matcher::{Coercion, MatchRule, Matcher};
    use crate::memory::InMemoryInventory;
    use crate::operations::State;
    use crate::reconciler::Reconciler;
    use crate::record::decode_observed;
    use crate::schema::{ConfigSpec, FieldSpec};
    use serde_json::json;
    use tokio_test::block_on;

    fn profile(mode: WriteMode, addressing: UpdateAddressing) -> ResourceProfile {
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
            .endpoints(Endpoints {
                list: "/api/netconf".into(),
                create: "/api/netconf".into(),
                update: match addressing {
                    UpdateAddressing::Path => "/api/netconf/{id}".into(),
                    UpdateAddressing::Body => "/api/netconf".into(),
                },
                delete: "/api/netconf/{id}".into(),
            })
            .write_mode(mode)
            .update_addressing(addressing)
            .build()
            .unwrap()
    }

    fn plan(profile: &ResourceProfile, desired: Value, observed: Value) -> OperationSet {
        let desired = profile.desired(desired.as_array().unwrap()).unwrap();
        let observed = decode_observed(observed, None).unwrap();
        Reconciler::new(profile)
            .plan(&desired, &observed, State::Present)
            .unwrap()
    }

    #[test]
    fn test_per_record_create_and_path_update() {
        let profile = profile(WriteMode::PerRecord, UpdateAddressing::Path);
        let api = InMemoryInventory::new().with_records([
            json!({"id": "a", "netconfPort": "830", "description": "old"}),
        ]);
        let ops = plan(
            &profile,
            json!([{"port": 830, "description": "x"}, {"port": 22}]),
            json!(api.records()),
        );

        let report = block_on(Executor::new(&profile, &api).execute(&ops, false)).unwrap();
        assert_eq!(report.added, vec![json!(22)]);
        assert_eq!(report.modified.items(), &[json!(830)]);

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].verb, Verb::Post);
        assert_eq!(calls[0].payload, Some(json!({"netconfPort": "22"})));
        assert_eq!(calls[1].verb, Verb::Put);
        assert_eq!(calls[1].path, "/api/netconf/a");
        assert_eq!(
            calls[1].payload,
            Some(json!({"netconfPort": "830", "description": "x"}))
        );
    }

    #[test]
    fn test_batch_writes_with_body_id() {
        let profile = profile(WriteMode::Batch, UpdateAddressing::Body);
        let api = InMemoryInventory::new().with_records([
            json!({"id": "a", "netconfPort": "830", "description": "old"}),
        ]);
        let ops = plan(
            &profile,
            json!([{"port": 830, "description": "x"}, {"port": 22}, {"port": 23}]),
            json!(api.records()),
        );

        block_on(Executor::new(&profile, &api).execute(&ops, false)).unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].payload,
            Some(json!([{"netconfPort": "22"}, {"netconfPort": "23"}]))
        );
        assert_eq!(calls[1].path, "/api/netconf");
        assert_eq!(
            calls[1].payload,
            Some(json!([{"netconfPort": "830", "description": "x", "id": "a"}]))
        );
    }

    #[test]
    fn test_dry_run_makes_no_mutating_calls() {
        let profile = profile(WriteMode::PerRecord, UpdateAddressing::Path);
        let api = InMemoryInventory::new().with_records([
            json!({"id": "a", "netconfPort": "830", "description": "old"}),
        ]);
        let ops = plan(
            &profile,
            json!([{"port": 830, "description": "x"}, {"port": 22}]),
            json!(api.records()),
        );

        let report = block_on(Executor::new(&profile, &api).execute(&ops, true)).unwrap();
        assert!(report.changed);
        assert_eq!(report.added, vec![json!(22)]);
        assert_eq!(report.modified.items(), &[json!(830)]);
        assert_eq!(api.mutation_count(), 0);
    }

    #[test]
    fn test_failure_carries_partial_report() {
        let profile = profile(WriteMode::PerRecord, UpdateAddressing::Path);
        let api =
            InMemoryInventory::new().fail_on(Verb::Post, 2, TransportError::status(500, "boom"));
        let ops = plan(&profile, json!([{"port": 1}, {"port": 2}, {"port": 3}]), json!([]));

        let err = block_on(Executor::new(&profile, &api).execute(&ops, false)).unwrap_err();
        assert_eq!(err.to_string(), "create failed: HTTP 500: boom");
        let partial = err.partial_report().unwrap();
        assert_eq!(partial.added, vec![json!(1)]);
        assert_eq!(api.records().len(), 1);
    }

    #[test]
    fn test_diagnostics_become_warnings() {
        let profile = profile(WriteMode::PerRecord, UpdateAddressing::Path);
        let api = InMemoryInventory::new();
        let mut ops = OperationSet::new();
        ops.diagnostics.push("skipped".into());

        let report = block_on(Executor::new(&profile, &api).execute(&ops, false)).unwrap();
        assert!(!report.changed);
        assert_eq!(report.warnings, vec!["skipped".to_string()]);
    }
}
