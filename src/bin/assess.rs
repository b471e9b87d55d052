//! One-shot assessment: RawInput JSON in, Assessment JSON out.
//!
//! # Usage
//!
//! ```bash
//! echo '{"age":45,"sex":"Male","cp":"asymptomatic","chol":250,"thalch":150,"exang":"No"}' \
//!     | cargo run --bin assess -- --model models -
//! ```
//!
//! Errors are printed to stderr as `CODE: message` and exit with status 1.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};

use heartrisk::adapters::JsonArtifact;
use heartrisk::config::LogMode;
use heartrisk::{AppConfig, Assessment, AssessmentService, FeatureSchema, HeartRiskError, RawInput};

const USAGE: &str = "Usage: assess [--model PATH] [--schema reduced|full] [INPUT.json|-]";

struct Args {
    model: Option<PathBuf>,
    schema: Option<FeatureSchema>,
    input: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        model: None,
        schema: None,
        input: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => {
                parsed.model = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?));
            }
            "--schema" => {
                let v = args.next().ok_or_else(|| anyhow!(USAGE))?;
                parsed.schema = Some(v.parse().map_err(|e: String| anyhow!(e))?);
            }
            "-h" | "--help" => bail!(USAGE),
            "-" => parsed.input = None,
            _ if arg.starts_with("--") => bail!("Unknown arg: {arg}\n{USAGE}"),
            _ => parsed.input = Some(PathBuf::from(arg)),
        }
    }

    Ok(parsed)
}

fn read_input(path: Option<&PathBuf>) -> heartrisk::Result<RawInput> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&text)?)
}

fn assess(config: &AppConfig, input: Option<&PathBuf>) -> heartrisk::Result<Assessment> {
    let policy = config.verification_policy()?;
    let artifact = JsonArtifact::load(&config.model_path, &policy)?;
    let service = AssessmentService::new(Arc::new(artifact), config.schema)?;

    let raw = read_input(input)?;
    service.assess(&raw)
}

fn run() -> anyhow::Result<Result<Assessment, HeartRiskError>> {
    let args = parse_args()?;

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => return Ok(Err(e.into())),
    };
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(schema) = args.schema {
        config.schema = schema;
    }
    if config.log_mode != LogMode::File {
        config.log_mode = LogMode::Stderr;
    }

    let _guard = heartrisk::logging::init(&config).context("Failed to initialise logging")?;
    Ok(assess(&config, args.input.as_ref()))
}

fn main() -> ExitCode {
    match run() {
        Ok(Ok(assessment)) => match serde_json::to_string_pretty(&assessment) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("SERIALIZATION_ERROR: {e}");
                ExitCode::FAILURE
            }
        },
        Ok(Err(e)) => {
            eprintln!("{}: {e}", e.code());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(2)
        }
    }
}
