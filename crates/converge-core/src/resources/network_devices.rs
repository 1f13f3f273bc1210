//! Network devices managed by the inventory.
//!
//! Devices are matched on their management address. The API offers no
//! reliable way to compare device attributes, so updates are not
//! supported: drift on a matched device is reported, never written.

use serde_json::Value;

use crate::error::Result;
use crate::field_map::{FieldMap, MapEntry, Transform};
use crate::matcher::{MatchRule, Matcher};
use crate::profile::{Endpoints, ResourceProfile};
use crate::schema::{ConfigSpec, FieldSpec};

/// Config device type to the API's device type.
fn device_type(value: &Value) -> Value {
    match value.as_str() {
        Some("network") => Value::from("NETWORK_DEVICE"),
        Some("compute") => Value::from("COMPUTE_DEVICE"),
        Some("meraki") => Value::from("MERAKI_DASHBOARD"),
        _ => value.clone(),
    }
}

pub fn network_devices() -> Result<ResourceProfile> {
    let spec = ConfigSpec::new()
        .field("name", FieldSpec::str())
        .field(
            "type",
            FieldSpec::str()
                .with_choices(["network", "compute", "meraki"])
                .with_default("network"),
        )
        .field("address", FieldSpec::str())
        .field("username", FieldSpec::str())
        .field("password", FieldSpec::str().secret())
        .field("enable_password", FieldSpec::str().secret())
        .field(
            "transport",
            FieldSpec::str()
                .with_choices(["telnet", "ssh"])
                .with_default("ssh"),
        )
        .field("snmp_ro_community", FieldSpec::str())
        .field("snmp_rw_community", FieldSpec::str())
        .field("snmp_retries", FieldSpec::int())
        .field("snmp_timeout", FieldSpec::int())
        .field(
            "snmp_version",
            FieldSpec::str().with_choices(["v2", "v3"]).with_default("v2"),
        );

    let field_map = FieldMap::new([
        MapEntry::new("name").to("hostname"),
        MapEntry::new("type").with_transform(Transform::Custom(device_type)),
        MapEntry::new("address")
            .to("ipAddress")
            .with_transform(Transform::WrapList),
        MapEntry::new("username").to("userName"),
        MapEntry::new("password"),
        MapEntry::new("enable_password").to("enablePassword"),
        MapEntry::new("transport").to("cliTransport"),
        MapEntry::new("snmp_ro_community").to("snmpROCommunity"),
        MapEntry::new("snmp_rw_community").to("snmpRWCommunity"),
        MapEntry::new("snmp_retries").to("snmpRetry"),
        MapEntry::new("snmp_timeout").to("snmpTimeout"),
        MapEntry::new("snmp_version").to("snmpVersion"),
    ])?;

    ResourceProfile::builder("network-devices")
        .spec(spec)
        .field_map(field_map)
        .matcher(Matcher::new([MatchRule::new("address", "managementIpAddress")]))
        .endpoints(Endpoints::collection("/dna/intent/api/v1/network-device"))
        .envelope("response")
        .supports_update(false)
        .build()
}
