mod config;
mod error;
mod llm;
mod testgen;

use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::llm::LlmClient;
use crate::testgen::{materialize, run_pipeline, GeneratedTest, PipelineRun, SourceFile};

#[derive(Parser)]
#[command(
    name = "unitforge",
    version,
    about = "LLM-driven Unity test generation for embedded C sources"
)]
struct Cli {
    /// C source file to generate tests for
    file: PathBuf,

    #[arg(long, help = "Module name used in test naming (defaults to the file stem)")]
    module: Option<String>,

    #[arg(long, help = "Provider: openai | anthropic")]
    provider: Option<String>,

    #[arg(long, help = "Model for free-text stages (summaries, test code)")]
    text_model: Option<String>,

    #[arg(long, help = "Model for JSON stages (selection, conditions)")]
    json_model: Option<String>,

    #[arg(long, help = "Override the provider API base URL")]
    base_url: Option<String>,

    #[arg(long, help = "API key (or set OPENAI_API_KEY / ANTHROPIC_API_KEY)")]
    api_key: Option<String>,

    #[arg(long, help = "Write each generated test to this directory")]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Only print the JSON run report")]
    json_only: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Persist the resolved provider config as defaults"
    )]
    save_config: bool,
}

#[derive(Serialize)]
struct RunReport<'a> {
    run_id: String,
    generated_at: String,
    file: String,
    module: &'a str,
    text_model: &'a str,
    json_model: &'a str,
    functions: &'a [String],
    conditions: &'a HashMap<String, Vec<String>>,
    tests: &'a [GeneratedTest],
    written: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = config::resolve(
        cli.provider.as_deref(),
        cli.text_model.clone(),
        cli.json_model.clone(),
        cli.base_url.clone(),
        cli.api_key.clone(),
    )?;

    if cli.save_config {
        config::save_config(&cfg)?;
    }

    if cfg.api_key.trim().is_empty() {
        return Err(format!(
            "no API key configured; pass --api-key or set {}",
            cfg.provider.api_key_var()
        )
        .into());
    }

    let source = SourceFile::from_path(&cli.file, cli.module.clone())?;
    let client = LlmClient::new(cfg.clone());

    let run = run_pipeline(&client, &source)?;

    let written = match cli.out.as_ref() {
        Some(dir) => materialize::write_suite(dir, &source.module, &run.suite)?,
        None => Vec::new(),
    };

    let report = RunReport {
        run_id: Uuid::new_v4().to_string(),
        generated_at: Utc::now().to_rfc3339(),
        file: cli.file.display().to_string(),
        module: &source.module,
        text_model: &cfg.text_model,
        json_model: &cfg.json_model,
        functions: &run.functions,
        conditions: &run.conditions,
        tests: run.suite.tests(),
        written: written.iter().map(|p| p.display().to_string()).collect(),
    };

    let json_report = serde_json::to_string_pretty(&report)?;

    if cli.json_only {
        println!("{json_report}");
        return Ok(());
    }

    for test in run.suite.iter() {
        println!("/* ===== test_{}_{} ===== */", source.module, test.function);
        println!("{}\n", test.code.trim_end());
    }

    print_summary(&run, &source, &report.written);

    Ok(())
}

fn print_summary(run: &PipelineRun, source: &SourceFile, written: &[String]) {
    println!("module: {}", source.module);
    println!("functions selected: {}", run.functions.len());

    for function in &run.functions {
        let conditions = run.conditions.get(function).map(Vec::len).unwrap_or(0);
        println!("  {function} ({conditions} conditions)");
    }

    println!("tests generated: {}", run.suite.len());

    for path in written {
        println!("written: {path}");
    }
}
