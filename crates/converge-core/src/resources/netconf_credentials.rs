//! NETCONF global credentials.
//!
//! Ports are declared as integers but the API stores them as strings, so
//! the port is stringified on the way out and matched with string
//! coercion. Writes are batched and updates carry the id in the body.

use crate::error::Result;
use crate::field_map::{FieldMap, MapEntry, Transform};
use crate::matcher::{Coercion, MatchRule, Matcher};
use crate::profile::{Endpoints, Identity, ResourceProfile, UpdateAddressing, WriteMode};
use crate::schema::{ConfigSpec, FieldSpec};

const BASE: &str = "/dna/intent/api/v1/global-credential";

pub fn netconf_credentials() -> Result<ResourceProfile> {
    let spec = ConfigSpec::new()
        .field("port", FieldSpec::int().required())
        .field("description", FieldSpec::str())
        .field("comments", FieldSpec::str());

    let field_map = FieldMap::new([
        MapEntry::new("port")
            .to("netconfPort")
            .with_transform(Transform::Stringify),
        MapEntry::new("description"),
        MapEntry::new("comments"),
    ])?;

    ResourceProfile::builder("netconf-credentials")
        .spec(spec)
        .field_map(field_map)
        .matcher(Matcher::new([
            MatchRule::new("port", "netconfPort").with_coercion(Coercion::String)
        ]))
        .endpoints(Endpoints {
            list: format!("{BASE}?credentialSubType=NETCONF"),
            create: format!("{BASE}/netconf"),
            update: format!("{BASE}/netconf"),
            delete: format!("{BASE}/{{id}}"),
        })
        .envelope("response")
        .identity(Identity::new("port", "netconfPort").with_coercion(Coercion::Integer))
        .write_mode(WriteMode::Batch)
        .update_addressing(UpdateAddressing::Body)
        .build()
}
