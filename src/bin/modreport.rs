//! Command line front end: generate a mod report from a host state dump.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use modreport_core::config::ReportConfig;
use modreport_core::operations::{save_report, ReportFormat};
use modreport_core::report::{DigestMode, ReportGenerator};
use modreport_core::HostState;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Generate a diagnostic report for an installed mod
#[derive(Parser)]
#[command(name = "modreport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host state exported by the mod manager (JSON)
    #[arg(short, long)]
    state: PathBuf,

    /// Id of the mod to report on
    #[arg(short = 'm', long = "mod")]
    mod_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Save the report into this directory instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// When to compute file checksums
    #[arg(short, long, value_enum, default_value_t = Digests::Ask)]
    digests: Digests,

    /// Settings file (JSON)
    #[arg(short, long, env = "MODREPORT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Digests {
    Always,
    Never,
    Ask,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => ReportFormat::Text,
            Format::Json => ReportFormat::Json,
        }
    }
}

impl From<Digests> for DigestMode {
    fn from(digests: Digests) -> Self {
        match digests {
            Digests::Always => DigestMode::Always,
            Digests::Never => DigestMode::Never,
            Digests::Ask => DigestMode::Ask,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    }
    .with_env_overrides()?;

    let content = std::fs::read_to_string(&cli.state)
        .context(format!("Failed to read host state: {:?}", cli.state))?;
    let state: HostState = serde_json::from_str(&content)
        .context(format!("Failed to parse host state: {:?}", cli.state))?;

    let generator = ReportGenerator::new(config);
    let report = match generator
        .generate(&state, &cli.mod_id, cli.digests.into(), &confirm_on_stdin)
        .await
    {
        Ok(report) => report,
        // Already logged by the generator.
        Err(e) if e.is_cancellation() => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let format = ReportFormat::from(cli.format);
    match &cli.output {
        Some(dir) => {
            let path = save_report(&report, dir, format)?;
            println!("{}", path.display());
        }
        None => print!("{}", format.render(&report)?),
    }

    Ok(())
}

fn confirm_on_stdin(file_count: usize) -> bool {
    eprint!(
        "This mod contains {} files. Generating checksums may take a while. Calculate them? [y/N] ",
        file_count
    );
    let _ = io::stderr().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
