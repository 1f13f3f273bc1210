//! Built-in resource profiles for Cisco DNA Center style inventories.

mod netconf_credentials;
mod network_devices;

use crate::error::{ConvergeError, Result};
use crate::profile::ResourceProfile;

pub use netconf_credentials::netconf_credentials;
pub use network_devices::network_devices;

/// Names accepted by [`lookup`], in listing order.
pub const NAMES: &[&str] = &["netconf-credentials", "network-devices"];

/// Build the built-in profile called `name`.
pub fn lookup(name: &str) -> Result<ResourceProfile> {
    match name {
        "netconf-credentials" => netconf_credentials(),
        "network-devices" => network_devices(),
        other => Err(ConvergeError::profile(
            other,
            format!("unknown resource type, expected one of: {}", NAMES.join(", ")),
        )),
    }
}

/// Every built-in profile, in [`NAMES`] order.
pub fn all() -> Result<Vec<ResourceProfile>> {
    NAMES.iter().map(|name| lookup(name)).collect()
}
