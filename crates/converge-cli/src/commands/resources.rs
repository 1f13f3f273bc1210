use anyhow::Result;
use converge_core::resources;

use crate::cli::OutputFormat;
use crate::output::print_resources;

pub fn list(format: OutputFormat) -> Result<()> {
    let profiles = resources::all()?;
    print_resources(&profiles, format)
}
