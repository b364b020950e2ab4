use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

use cgrp_parser::{CgrpFile, DiagnosticContext, ParserConfig};

#[derive(Parser)]
#[command(
    name = "cgrp_parser",
    about = "Unpack a CGRP sound group into its wave archives, banks and sequences",
    version
)]
struct Cli {
    /// CGRP file to extract
    input: PathBuf,

    /// Directory the extracted tree is written to
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Conversion-mode flag passed to every bank
    #[arg(long)]
    bank_flag: bool,

    /// Strict limits; file table lengths must match payload lengths
    #[arg(long, conflicts_with = "permissive")]
    strict: bool,

    /// Relaxed limits for unusually large groups
    #[arg(long)]
    permissive: bool,

    /// Write manifest.json into the output directory
    #[arg(long)]
    manifest: bool,

    /// Print the extracted catalog as JSON
    #[arg(long)]
    json: bool,

    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    let mut config = if cli.strict {
        ParserConfig::strict()
    } else if cli.permissive {
        ParserConfig::permissive()
    } else {
        ParserConfig::default()
    };
    config.bank_conversion_flag = cli.bank_flag;
    config.write_manifest = cli.manifest;

    let ctx = DiagnosticContext::new();
    let mut group = CgrpFile::open_with_config(&cli.input, &cli.output, config, &ctx)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;

    group
        .extract()
        .with_context(|| format!("Failed to extract {}", cli.input.display()))?;

    let catalog = group.catalog();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&catalog.summary())?);
    } else {
        println!(
            "Extracted {} wave archives, {} banks, {} sequences into {} ({} warnings)",
            catalog.wave_archives.len(),
            catalog.banks.len(),
            catalog.sequences.len(),
            cli.output.display(),
            ctx.warning_count()
        );
    }

    Ok(())
}
