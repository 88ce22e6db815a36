use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use plateau::data::loader::load_file;
use plateau::report::{
    render_table, to_json, to_json_all, write_csv, write_csv_by_series, ReportRow,
};
use plateau::{AnalysisConfig, Gesture, GestureKind, Workspace};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

/// Detect jumps in a CSV column and report statistics per stable interval.
#[derive(Parser)]
#[command(name = "plateau")]
#[command(version)]
struct Cli {
    /// CSV file to analyse
    input: PathBuf,

    /// Series whose jumps define the stable intervals
    #[arg(short, long)]
    series: String,

    /// Other series to report over the same intervals
    #[arg(short, long)]
    follow: Vec<String>,

    /// JSON configuration file
    #[arg(short, long, env = "PLATEAU_CONFIG")]
    config: Option<PathBuf>,

    /// Rolling window in samples
    #[arg(long, allow_negative_numbers = true)]
    window: Option<i64>,

    /// Rolling standard deviation threshold
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f64>,

    /// Samples excluded before each transition
    #[arg(long, allow_negative_numbers = true)]
    left_zone: Option<i64>,

    /// Samples excluded after each transition
    #[arg(long, allow_negative_numbers = true)]
    right_zone: Option<i64>,

    /// Decimals shown in the report (values are floored)
    #[arg(long, allow_negative_numbers = true)]
    precision: Option<i64>,

    /// Add a transition after detection
    #[arg(long = "add", value_name = "IDX")]
    add: Vec<usize>,

    /// Delete a transition after detection
    #[arg(long = "delete", value_name = "IDX")]
    delete: Vec<usize>,

    #[arg(long, value_enum, default_value = "table")]
    format: Format,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(window) = cli.window {
        config.set_window(window)?;
    }
    if let Some(threshold) = cli.threshold {
        config.set_threshold(threshold)?;
    }
    if cli.left_zone.is_some() || cli.right_zone.is_some() {
        let zones = config.zones();
        config.set_zones(
            cli.left_zone.unwrap_or(zones.left as i64),
            cli.right_zone.unwrap_or(zones.right as i64),
        )?;
    }
    if let Some(precision) = cli.precision {
        config.set_precision(precision)?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let store = load_file(&cli.input)
        .and_then(|data| data.into_store())
        .with_context(|| format!("loading {}", cli.input.display()))?;
    if !store.contains(&cli.series) {
        bail!(
            "no numeric column {:?}; available: {}",
            cli.series,
            store.names().collect::<Vec<_>>().join(", ")
        );
    }

    let mut workspace = Workspace::new(store, config);
    workspace.activate(&cli.series)?;
    for target in &cli.follow {
        workspace
            .follow(target, &cli.series)
            .with_context(|| format!("following {target:?}"))?;
    }

    let edits = cli
        .add
        .iter()
        .map(|&i| GestureKind::Add(i))
        .chain(cli.delete.iter().map(|&i| GestureKind::Delete(i)));
    for kind in edits {
        let outcome = workspace.apply(Gesture::new(cli.series.as_str(), kind.clone()))?;
        if !outcome.is_applied() {
            tracing::warn!(?kind, ?outcome, "edit had no effect");
        }
    }

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let reports: Vec<(&str, Vec<ReportRow>)> = std::iter::once(&cli.series)
        .chain(&cli.follow)
        .map(|name| (name.as_str(), workspace.report(name).unwrap_or_default()))
        .collect();
    // With followers every row is tagged with its series.
    match (cli.format, reports.as_slice()) {
        (Format::Table, _) => {
            for (name, rows) in &reports {
                writeln!(out, "{}", render_table(name, rows))?;
            }
        }
        (Format::Csv, [(_, rows)]) => write_csv(rows, &mut out)?,
        (Format::Csv, _) => write_csv_by_series(&reports, &mut out)?,
        (Format::Json, [(name, rows)]) => writeln!(out, "{}", to_json(name, rows)?)?,
        (Format::Json, _) => writeln!(out, "{}", to_json_all(&reports)?)?,
    }
    out.flush()?;
    Ok(())
}
