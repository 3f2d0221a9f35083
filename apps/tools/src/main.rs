use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use control_schema::{ControlSchema, SkipReason};
use serde::Serialize;
use serde_json::{Map, Value};
use shared::vehicle::default_state;
use storage::{ControlSource, StateStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dashctl")]
struct Cli {
    #[arg(long, default_value = "controls.json")]
    controls: PathBuf,
    #[arg(long, default_value = "state.json")]
    state: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize the control catalog.
    CheckControls,
    /// Print the merged state document.
    Show,
    /// Apply a nested JSON payload and persist the result.
    Apply { payload: String },
    /// Overwrite the state document with defaults.
    Reset,
}

#[derive(Debug, PartialEq, Eq)]
struct CatalogSummary {
    descriptors: usize,
    indexed: usize,
    pathless: usize,
    aliases: Vec<(String, String)>,
    duplicates: Vec<String>,
}

fn summarize(schema: &ControlSchema) -> CatalogSummary {
    let catalog = schema.catalog();
    CatalogSummary {
        descriptors: catalog.len(),
        indexed: schema.index().len(),
        pathless: catalog.iter().filter(|c| c.path.is_none()).count(),
        aliases: catalog
            .aliases()
            .map(|(path, target)| (path.to_string(), target.to_string()))
            .collect(),
        duplicates: schema.index().duplicate_paths().to_vec(),
    }
}

fn parse_payload(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("payload is not valid json")? {
        Value::Object(payload) => Ok(payload),
        other => bail!("payload must be a json object, got {other}"),
    }
}

fn render_json(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to render json")
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let schema = ControlSource::new(&cli.controls).load_schema();
    let store = StateStore::new(&cli.state);

    match cli.command {
        Command::CheckControls => {
            let summary = summarize(&schema);
            println!(
                "descriptors={} indexed={} pathless={}",
                summary.descriptors, summary.indexed, summary.pathless
            );
            for (path, target) in &summary.aliases {
                println!("alias {path} -> {target}");
            }
            for path in &summary.duplicates {
                println!("duplicate {path}");
            }
            if !summary.duplicates.is_empty() {
                bail!("{} control path(s) declared more than once", summary.duplicates.len());
            }
        }
        Command::Show => {
            let state = store.load(&default_state(), &schema)?;
            print_json(&state)?;
        }
        Command::Apply { payload } => {
            let payload = parse_payload(&payload)?;
            let mut state = store.load(&default_state(), &schema)?;
            let report = schema.apply_update(&mut state, &payload, &store)?;
            for change in &report.applied {
                println!("applied {} -> {} = {}", change.path, change.target, change.value);
            }
            for skipped in &report.skipped {
                match &skipped.reason {
                    SkipReason::UnknownPath => println!("skipped {}: unknown path", skipped.path),
                    SkipReason::Rejected(rejection) => {
                        println!("skipped {}: {rejection}", skipped.path)
                    }
                }
            }
            print_json(&state)?;
        }
        Command::Reset => {
            let state = store.reset(&default_state())?;
            print_json(&state)?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
