//! Loading of desired-state files.
//!
//! A file is JSON or TOML. JSON may be a bare array of records; otherwise
//! the document carries a `config` array and an optional `state`:
//!
//! ```toml
//! state = "present"
//!
//! [[config]]
//! port = 830
//! description = "lab"
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use converge_core::State;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredFile {
    #[serde(default)]
    pub config: Vec<Value>,
    #[serde(default)]
    pub state: Option<State>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// `.toml` files are TOML, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Read `file`, or JSON from stdin when no file is given.
pub fn load(file: &Option<String>) -> Result<DesiredFile> {
    match file {
        Some(path) => {
            let content =
                fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
            parse(&content, FileFormat::from_path(Path::new(path)))
                .with_context(|| format!("Invalid config file: {path}"))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            parse(&buf, FileFormat::Json).context("Invalid config on stdin")
        }
    }
}

pub fn parse(content: &str, format: FileFormat) -> Result<DesiredFile> {
    match format {
        FileFormat::Toml => toml::from_str(content).context("Invalid TOML"),
        FileFormat::Json => match serde_json::from_str(content).context("Invalid JSON")? {
            Value::Array(config) => Ok(DesiredFile {
                config,
                state: None,
            }),
            document @ Value::Object(_) => {
                serde_json::from_value(document).context("Invalid config document")
            }
            _ => anyhow::bail!("Expected an array of records or a document with a `config` key"),
        },
    }
}
