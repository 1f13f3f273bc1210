use anyhow::Result;
use colored::Colorize;
use converge_core::{ChangeReport, OperationSet, RemoteApi, State, resources};

use crate::cli::{ApplyArgs, OutputFormat, PlanArgs, StateArg};
use crate::desired;
use crate::output::{print_plan, print_report, print_warning};

/// `--state` wins over the file's `state` key; both absent means present.
pub fn resolve_state(flag: Option<StateArg>, file: Option<State>) -> State {
    flag.map(State::from).or(file).unwrap_or_default()
}

pub async fn apply(
    api: &dyn RemoteApi,
    args: &ApplyArgs,
    format: OutputFormat,
) -> Result<ChangeReport> {
    let profile = resources::lookup(&args.resource)?;
    let file = desired::load(&args.file)?;
    let state = resolve_state(args.state, file.state);

    match converge_core::converge(&profile, api, &file.config, state, args.check).await {
        Ok(report) => {
            print_report(&report, format)?;
            if args.check && report.changed {
                eprintln!("{}", "Check mode: nothing was changed.".dimmed());
            }
            Ok(report)
        }
        Err(err) => {
            if let Some(partial) = err.partial_report() {
                print_warning("Stopped part way. Changes applied before the failure:");
                print_report(partial, format)?;
            }
            Err(err.into())
        }
    }
}

pub async fn plan(
    api: &dyn RemoteApi,
    args: &PlanArgs,
    format: OutputFormat,
) -> Result<OperationSet> {
    let profile = resources::lookup(&args.resource)?;
    let file = desired::load(&args.file)?;
    let state = resolve_state(args.state, file.state);

    let ops = converge_core::plan(&profile, api, &file.config, state).await?;
    print_plan(&profile, &ops, format)?;
    Ok(ops)
}
