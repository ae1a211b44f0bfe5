//! Blueprint DSL CLI
//!
//! Command-line interface for parsing blueprints and preparing deployment
//! plans.

use std::path::PathBuf;
use std::process::ExitCode;

use blueprint_dsl::{
    load_blueprint_auto, load_inputs, parse_blueprint, parse_input_assignment,
    prepare_deployment_plan, Blueprint,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Map;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blueprint-dsl")]
#[command(about = "Validate blueprints and prepare deployment plans")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a blueprint, printing it as JSON
    Parse {
        /// Blueprint source: file path or URL (http:// or https://)
        blueprint: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Prepare a deployment plan with the given input values
    Plan {
        /// Blueprint source: file path or URL (http:// or https://)
        blueprint: String,

        /// YAML/JSON file with input values
        #[arg(long)]
        inputs: Option<PathBuf>,

        /// Input value as key=value (repeatable, overrides --inputs)
        #[arg(long = "input", short = 'i', value_name = "KEY=VALUE")]
        input: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            blueprint,
            output,
            pretty,
        } => run_parse(&blueprint, output, pretty),

        Commands::Plan {
            blueprint,
            inputs,
            input,
            output,
            pretty,
        } => run_plan(&blueprint, inputs, &input, output, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_and_parse(source: &str) -> Result<Blueprint, u8> {
    let document = load_blueprint_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    info!(source, "loaded blueprint");

    parse_blueprint(&document).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn run_parse(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let blueprint = load_and_parse(source)?;
    write_json(&blueprint, output, pretty)
}

fn run_plan(
    source: &str,
    inputs_file: Option<PathBuf>,
    assignments: &[String],
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let blueprint = load_and_parse(source)?;

    let mut supplied = match inputs_file {
        Some(path) => load_inputs(&path).map_err(|e| {
            eprintln!("Error loading inputs: {}", e);
            e.exit_code() as u8
        })?,
        None => Map::new(),
    };
    for assignment in assignments {
        let (name, value) = parse_input_assignment(assignment).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
        supplied.insert(name, value);
    }
    info!(supplied = supplied.len(), "collected input values");

    let plan = prepare_deployment_plan(&blueprint, Some(&supplied)).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    write_json(&plan, output, pretty)
}

fn write_json<T: Serialize>(value: &T, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

