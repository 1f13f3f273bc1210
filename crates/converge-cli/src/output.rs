use std::collections::BTreeSet;

use anyhow::Result;
use colored::Colorize;
use converge_core::{ChangeReport, Modified, OperationSet, ResourceProfile};
use serde::Serialize;
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => println!("{}", format_yaml(value, 0)),
        OutputFormat::Table => print_records(value.as_array().map_or(&[][..], Vec::as_slice)),
    }
    Ok(())
}

fn print_serialized<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    print_value(&serde_json::to_value(value)?, format)
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// The outcome of `apply`. JSON and YAML carry the report verbatim.
pub fn print_report(report: &ChangeReport, format: OutputFormat) -> Result<()> {
    if format != OutputFormat::Table {
        return print_serialized(report, format);
    }

    let mut builder = Builder::default();
    builder.push_record(["Action", "Id"]);
    for id in &report.added {
        builder.push_record(["added".to_string(), scalar(id)]);
    }
    for id in report.modified.items() {
        builder.push_record(["modified".to_string(), scalar(id)]);
    }
    for id in &report.removed {
        builder.push_record(["removed".to_string(), scalar(id)]);
    }

    if report.changed {
        println!("{}", builder.build().with(Style::rounded()));
    } else {
        println!("No changes.");
    }
    if report.modified == Modified::Unsupported {
        println!("{}", "Updates are not supported for this resource type.".dimmed());
    }
    for warning in &report.warnings {
        print_warning(warning);
    }
    Ok(())
}

/// The operations `plan` found, keyed by identity.
pub fn print_plan(
    profile: &ResourceProfile,
    ops: &OperationSet,
    format: OutputFormat,
) -> Result<()> {
    if format != OutputFormat::Table {
        return print_serialized(ops, format);
    }

    let identity = profile.identity();
    let mut builder = Builder::default();
    builder.push_record(["Action", "Id", "Fields"]);
    for desired in &ops.to_create {
        builder.push_record([
            "create".to_string(),
            scalar(&identity.of_desired(desired)),
            String::new(),
        ]);
    }
    for update in &ops.to_update {
        let changed: Vec<&str> = update.changed.iter().map(String::as_str).collect();
        builder.push_record([
            "update".to_string(),
            scalar(&identity.of_desired(&update.desired)),
            changed.join(", "),
        ]);
    }
    for observed in &ops.to_delete {
        builder.push_record([
            "delete".to_string(),
            scalar(&identity.of_observed(observed)),
            String::new(),
        ]);
    }

    if ops.is_empty() {
        println!("Nothing to do.");
    } else {
        println!("{}", builder.build().with(Style::rounded()));
        println!("Total: {}", ops.len());
    }
    for diagnostic in &ops.diagnostics {
        print_warning(diagnostic);
    }
    Ok(())
}

/// One row per record, one column per key seen in any record.
pub fn print_records(records: &[Value]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }

    let columns: BTreeSet<&str> = records
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|obj| obj.keys().map(String::as_str))
        .collect();

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for record in records {
        builder.push_record(
            columns
                .iter()
                .map(|c| record.get(*c).map_or_else(|| "-".to_string(), scalar)),
        );
    }
    println!("{}", builder.build().with(Style::rounded()));
    println!("Total: {}", records.len());
}

/// Built-in resource types, one row each.
pub fn print_resources(profiles: &[ResourceProfile], format: OutputFormat) -> Result<()> {
    let rows: Vec<Value> = profiles.iter().map(describe_profile).collect();
    if format != OutputFormat::Table {
        return print_value(&Value::Array(rows), format);
    }

    let mut builder = Builder::default();
    builder.push_record(["Name", "Fields", "Match", "Updates"]);
    for profile in profiles {
        let fields: Vec<String> = profile
            .spec()
            .iter()
            .map(|(name, field)| {
                let mut label = name.to_string();
                if field.required {
                    label.push('*');
                }
                if field.secret {
                    label.push_str(" (secret)");
                }
                label
            })
            .collect();
        builder.push_record([
            profile.name().to_string(),
            fields.join("\n"),
            match_summary(profile),
            if profile.supports_update() { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    println!("{}", "* required".dimmed());
    Ok(())
}

fn describe_profile(profile: &ResourceProfile) -> Value {
    let fields: Vec<Value> = profile
        .spec()
        .iter()
        .map(|(name, field)| {
            json!({
                "name": name,
                "type": field.kind.as_str(),
                "required": field.required,
                "secret": field.secret,
            })
        })
        .collect();
    json!({
        "name": profile.name(),
        "fields": fields,
        "match": match_summary(profile),
        "supports_update": profile.supports_update(),
    })
}

fn match_summary(profile: &ResourceProfile) -> String {
    profile
        .matcher()
        .rules()
        .iter()
        .map(|rule| format!("{} = {}", rule.local, rule.remote))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Strings without quotes, everything else as compact JSON.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_yaml(value: &Value, indent: usize) -> String {
    let prefix = " ".repeat(indent);
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.contains('\n') {
                let pad = " ".repeat(indent + 2);
                format!("|\n{pad}{}", s.replace('\n', &format!("\n{pad}")))
            } else {
                format!("\"{}\"", s.replace('"', "\\\""))
            }
        }
        Value::Array(arr) => {
            if arr.is_empty() {
                return "[]".to_string();
            }
            let items: Vec<String> = arr
                .iter()
                .map(|v| format!("{prefix}- {}", format_yaml(v, indent + 2).trim_start()))
                .collect();
            format!("\n{}", items.join("\n"))
        }
        Value::Object(obj) => {
            if obj.is_empty() {
                return "{}".to_string();
            }
            let items: Vec<String> = obj
                .iter()
                .map(|(k, v)| {
                    let val = format_yaml(v, indent + 2);
                    if val.starts_with('\n') {
                        format!("{prefix}{k}:{val}")
                    } else {
                        format!("{prefix}{k}: {val}")
                    }
                })
                .collect();
            if indent == 0 {
                items.join("\n")
            } else {
                format!("\n{}", items.join("\n"))
            }
        }
    }
}
