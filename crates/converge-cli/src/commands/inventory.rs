use anyhow::Result;
use converge_core::{Reconciler, RemoteApi, resources};
use serde_json::Value;

use crate::cli::{InventoryArgs, OutputFormat};
use crate::output::print_value;

/// Fetch the remote collection and print it under local field names.
pub async fn list(
    api: &dyn RemoteApi,
    args: &InventoryArgs,
    format: OutputFormat,
) -> Result<Vec<Value>> {
    let profile = resources::lookup(&args.resource)?;
    let observed = Reconciler::new(&profile).fetch_observed(api).await?;

    let rows: Vec<Value> = observed
        .iter()
        .map(|record| Value::Object(profile.field_map().localize(record)))
        .collect();
    print_value(&Value::Array(rows.clone()), format)?;
    Ok(rows)
}
