//! One-call entry points: validate, reconcile, execute.

use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::executor::Executor;
use crate::operations::{OperationSet, State};
use crate::profile::ResourceProfile;
use crate::reconciler::Reconciler;
use crate::remote::RemoteApi;
use crate::report::ChangeReport;

/// Converge the remote collection described by `profile` onto `raw_desired`.
///
/// Every desired record is validated before the first remote call, so a
/// schema error never leaves remote state half-applied. With `dry_run`
/// the current state is still fetched but nothing is written.
pub async fn converge(
    profile: &ResourceProfile,
    api: &dyn RemoteApi,
    raw_desired: &[Value],
    state: State,
    dry_run: bool,
) -> Result<ChangeReport> {
    let desired = profile.desired(raw_desired)?;
    info!(
        profile = profile.name(),
        backend = api.backend_name(),
        entries = desired.len(),
        %state,
        dry_run,
        "Converging"
    );

    let ops = Reconciler::new(profile).reconcile(api, &desired, state).await?;
    Executor::new(profile, api).execute(&ops, dry_run).await
}

/// Compute the operations `converge` would run, without executing them.
pub async fn plan(
    profile: &ResourceProfile,
    api: &dyn RemoteApi,
    raw_desired: &[Value],
    state: State,
) -> Result<OperationSet> {
    let desired = profile.desired(raw_desired)?;
    Reconciler::new(profile).reconcile(api, &desired, state).await
}
