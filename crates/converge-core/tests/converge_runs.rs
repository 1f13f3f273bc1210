//! End-to-end runs against the in-memory inventory.
//!
//! Each test drives `converge` the way a host would: raw desired records
//! in, change report out, with the in-memory backend standing in for the
//! remote API.

use converge_core::{
    ChangeReport, ConvergeError, ErrorCategory, InMemoryInventory, Modified, OperationKind,
    ResourceProfile, State, TransportError, Verb, converge, plan, resources,
};
use serde_json::{Value, json};

fn netconf() -> ResourceProfile {
    resources::lookup("netconf-credentials").expect("built-in profile")
}

fn devices() -> ResourceProfile {
    resources::lookup("network-devices").expect("built-in profile")
}

fn inventory(records: Value) -> InMemoryInventory {
    InMemoryInventory::new()
        .with_envelope("response")
        .with_records(records.as_array().cloned().unwrap_or_default())
}

fn desired(records: Value) -> Vec<Value> {
    records.as_array().cloned().unwrap_or_default()
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let profile = netconf();
    let api = inventory(json!([{"id": "1", "netconfPort": "830", "description": "old"}]));
    let config = desired(json!([
        {"port": 830, "description": "lab"},
        {"port": 22, "comments": "legacy"}
    ]));

    let first = converge(&profile, &api, &config, State::Present, false)
        .await
        .unwrap();
    assert!(first.changed);
    assert_eq!(first.added, vec![json!(22)]);
    assert_eq!(first.modified, Modified::Tracked(vec![json!(830)]));

    let mutations = api.mutation_count();
    let second = converge(&profile, &api, &config, State::Present, false)
        .await
        .unwrap();
    assert!(!second.changed);
    assert_eq!(second, ChangeReport::new(true));
    assert_eq!(api.mutation_count(), mutations);

    let ops = plan(&profile, &api, &config, State::Present).await.unwrap();
    assert!(ops.is_empty());
}

#[tokio::test]
async fn test_absent_is_idempotent() {
    let profile = netconf();
    let api = inventory(json!([
        {"id": "1", "netconfPort": "830"},
        {"id": "2", "netconfPort": "22"}
    ]));
    let config = desired(json!([{"port": 830}]));

    let first = converge(&profile, &api, &config, State::Absent, false)
        .await
        .unwrap();
    assert_eq!(first.removed, vec![json!(830)]);
    assert_eq!(api.records(), vec![json!({"id": "2", "netconfPort": "22"})]);

    let second = converge(&profile, &api, &config, State::Absent, false)
        .await
        .unwrap();
    assert!(!second.changed);
}

// =============================================================================
// Wire behaviour
// =============================================================================

#[tokio::test]
async fn test_netconf_writes_are_batched() {
    let profile = netconf();
    let api = inventory(json!([{"id": "1", "netconfPort": "830", "description": "old"}]));
    let config = desired(json!([
        {"port": 830, "description": "x"},
        {"port": 22},
        {"port": 23}
    ]));

    converge(&profile, &api, &config, State::Present, false)
        .await
        .unwrap();

    let calls = api.calls();
    let verbs: Vec<_> = calls.iter().map(|call| call.verb).collect();
    assert_eq!(verbs, vec![Verb::Get, Verb::Post, Verb::Put]);
    assert_eq!(
        calls[0].path,
        "/dna/intent/api/v1/global-credential?credentialSubType=NETCONF"
    );
    assert_eq!(calls[1].path, "/dna/intent/api/v1/global-credential/netconf");
    assert_eq!(
        calls[1].payload,
        Some(json!([{"netconfPort": "22"}, {"netconfPort": "23"}]))
    );
    assert_eq!(
        calls[2].payload,
        Some(json!([{"id": "1", "netconfPort": "830", "description": "x"}]))
    );
}

#[tokio::test]
async fn test_bulk_delete_removes_everything() {
    let profile = netconf();
    let api = inventory(json!([
        {"id": "1", "netconfPort": "830"},
        {"id": "2", "netconfPort": "22"}
    ]));

    let report = converge(&profile, &api, &[], State::Absent, false)
        .await
        .unwrap();

    assert_eq!(report.removed, vec![json!(830), json!(22)]);
    assert!(api.records().is_empty());
    let paths: Vec<_> = api
        .calls()
        .into_iter()
        .filter(|call| call.verb == Verb::Delete)
        .map(|call| call.path)
        .collect();
    assert_eq!(
        paths,
        vec![
            "/dna/intent/api/v1/global-credential/1",
            "/dna/intent/api/v1/global-credential/2"
        ]
    );
}

#[tokio::test]
async fn test_empty_config_with_present_is_a_noop() {
    let profile = netconf();
    let api = inventory(json!([{"id": "1", "netconfPort": "830"}]));

    let report = converge(&profile, &api, &[], State::Present, false)
        .await
        .unwrap();

    assert!(!report.changed);
    assert_eq!(api.records().len(), 1);
}

// =============================================================================
// Dry run
// =============================================================================

#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let profile = netconf();
    let api = inventory(json!([
        {"id": "1", "netconfPort": "830", "description": "old"},
        {"id": "2", "netconfPort": "22"}
    ]));
    let before = api.records();

    let check = converge(
        &profile,
        &api,
        &desired(json!([{"port": 830, "description": "x"}, {"port": 443}])),
        State::Present,
        true,
    )
    .await
    .unwrap();

    assert!(check.changed);
    assert_eq!(check.added, vec![json!(443)]);
    assert_eq!(check.modified.items(), &[json!(830)]);
    assert!(check.removed.is_empty());
    assert_eq!(api.mutation_count(), 0);
    assert_eq!(api.records(), before);

    let applied = converge(
        &profile,
        &api,
        &desired(json!([{"port": 830, "description": "x"}, {"port": 443}])),
        State::Present,
        false,
    )
    .await
    .unwrap();
    assert_eq!(applied, check);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_schema_error_stops_before_any_call() {
    let profile = netconf();
    let api = inventory(json!([]));

    let err = converge(
        &profile,
        &api,
        &desired(json!([{"port": 830}, {"port": 22, "vlan": 3}])),
        State::Present,
        false,
    )
    .await
    .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(err.is_pre_execution());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_is_a_transport_error() {
    let profile = netconf();
    let api = inventory(json!([])).fail_on(Verb::Get, 1, TransportError::connection("refused"));

    let err = converge(&profile, &api, &desired(json!([{"port": 1}])), State::Present, false)
        .await
        .unwrap_err();

    assert!(matches!(err, ConvergeError::Transport(_)));
    assert_eq!(err.to_string(), "failed to fetch current state: connection error: refused");
    assert_eq!(api.mutation_count(), 0);
}

#[tokio::test]
async fn test_delete_failure_keeps_earlier_work() {
    let profile = netconf();
    let api = inventory(json!([
        {"id": "1", "netconfPort": "830"},
        {"id": "2", "netconfPort": "22"},
        {"id": "3", "netconfPort": "23"}
    ]))
    .fail_on(Verb::Delete, 2, TransportError::status(500, "internal error"));

    let err = converge(&profile, &api, &[], State::Absent, false)
        .await
        .unwrap_err();

    let ConvergeError::RemoteOperation {
        operation, partial, ..
    } = &err
    else {
        panic!("expected a remote operation error, got {err:?}");
    };
    assert_eq!(*operation, OperationKind::Delete);
    assert!(partial.changed);
    assert_eq!(partial.removed, vec![json!(830)]);
    assert!(!err.is_pre_execution());
    assert_eq!(api.records().len(), 2);
}

#[tokio::test]
async fn test_update_failure_keeps_completed_creates() {
    let profile = netconf();
    let api = inventory(json!([{"id": "1", "netconfPort": "22", "description": "old"}]))
        .fail_on(Verb::Put, 1, TransportError::status(500, "internal error"));
    let config = desired(json!([
        {"port": 830},
        {"port": 22, "description": "new"}
    ]));

    let err = converge(&profile, &api, &config, State::Present, false)
        .await
        .unwrap_err();

    let ConvergeError::RemoteOperation {
        operation, partial, ..
    } = &err
    else {
        panic!("expected a remote operation error, got {err:?}");
    };
    assert_eq!(*operation, OperationKind::Update);
    assert!(partial.changed);
    assert_eq!(partial.added, vec![json!(830)]);
    assert_eq!(partial.modified, Modified::Tracked(Vec::new()));
    assert!(partial.removed.is_empty());

    let verbs: Vec<Verb> = api.calls().iter().map(|call| call.verb).collect();
    assert_eq!(verbs, vec![Verb::Get, Verb::Post, Verb::Put]);
    assert!(!verbs.contains(&Verb::Delete));

    let records = api.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["description"], json!("old"));
}

#[tokio::test]
async fn test_missing_envelope_is_a_shape_error() {
    let profile = netconf();
    // lists come back under a key the profile does not expect
    let api = InMemoryInventory::new().with_envelope("error");

    let err = converge(&profile, &api, &desired(json!([{"port": 830}])), State::Present, false)
        .await
        .unwrap_err();

    assert!(matches!(err, ConvergeError::Shape { .. }));
    assert_eq!(err.category(), ErrorCategory::Shape);
    assert_eq!(err.to_string(), "invalid API response: missing envelope 'response'");
    assert_eq!(api.mutation_count(), 0);
}

// =============================================================================
// Devices
// =============================================================================

#[tokio::test]
async fn test_devices_are_created_per_record() {
    let profile = devices();
    let api = inventory(json!([]));
    let config = desired(json!([
        {"address": "10.0.0.1", "username": "admin", "password": "secret"},
        {"address": "10.0.0.2", "type": "compute", "transport": "telnet"}
    ]));

    let report = converge(&profile, &api, &config, State::Present, false)
        .await
        .unwrap();

    assert_eq!(report.added, vec![json!("10.0.0.1"), json!("10.0.0.2")]);
    assert_eq!(report.modified, Modified::Unsupported);
    let posts: Vec<_> = api
        .calls()
        .into_iter()
        .filter(|call| call.verb == Verb::Post)
        .collect();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].path, "/dna/intent/api/v1/network-device");
    assert_eq!(
        posts[1].payload,
        Some(json!({
            "ipAddress": ["10.0.0.2"],
            "type": "COMPUTE_DEVICE",
            "cliTransport": "telnet",
            "snmpVersion": "v2"
        }))
    );
}

#[tokio::test]
async fn test_device_drift_is_a_warning() {
    let profile = devices();
    let api = inventory(json!([
        {"id": "dev-1", "managementIpAddress": "10.0.0.1", "hostname": "core-1"}
    ]));

    let report = converge(
        &profile,
        &api,
        &desired(json!([{"address": "10.0.0.1", "name": "core-2"}])),
        State::Present,
        false,
    )
    .await
    .unwrap();

    assert!(!report.changed);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(api.mutation_count(), 0);
    assert_eq!(
        serde_json::to_value(&report).unwrap()["modified"],
        json!("unsupported")
    );
}

#[tokio::test]
async fn test_device_removal_reports_addresses() {
    let profile = devices();
    let api = inventory(json!([
        {"id": "dev-1", "managementIpAddress": "10.0.0.1"},
        {"id": "dev-2", "managementIpAddress": "10.0.0.2"}
    ]));

    let report = converge(
        &profile,
        &api,
        &desired(json!([{"address": "10.0.0.2"}])),
        State::Absent,
        false,
    )
    .await
    .unwrap();

    assert_eq!(report.removed, vec![json!("10.0.0.2")]);
    assert_eq!(
        api.records(),
        vec![json!({"id": "dev-1", "managementIpAddress": "10.0.0.1"})]
    );
}
