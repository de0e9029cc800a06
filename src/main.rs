use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, Command};
use donation_analytics::logging::init_logging;
use donation_analytics::models::Config;
use donation_analytics::run_pipeline;
use std::path::PathBuf;
use tracing::info;

fn cli() -> Command {
    Command::new("donation-analytics")
        .version("0.1")
        .about("Reports running percentiles of repeat-donor contributions")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("Pipe-delimited contribution records")
                .required_unless_present("write-default-config")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("percentile")
                .value_name("PERCENTILE_FILE")
                .help("File whose first line is the percentile (0-100)")
                .required_unless_present("write-default-config")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .help("Where result lines are written (truncated first)")
                .required_unless_present("write-default-config")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("write-default-config")
                .long("write-default-config")
                .value_name("FILE")
                .help("Write a default configuration file and exit")
                .exclusive(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

fn path_arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    matches
        .get_one::<PathBuf>(name)
        .with_context(|| format!("missing argument: {}", name))
}

fn main() -> Result<()> {
    let matches = match cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        // Wrong argument shape: leave without output or diagnostics
        Err(_) => return Ok(()),
    };

    if let Some(path) = matches.get_one::<PathBuf>("write-default-config") {
        Config::default()
            .save_to_file(path)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        return Ok(());
    }

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };
    init_logging(&config.log_filter);

    let input = path_arg(&matches, "input")?;
    let percentile = path_arg(&matches, "percentile")?;
    let output = path_arg(&matches, "output")?;

    let summary = run_pipeline(input, percentile, output, &config)
        .with_context(|| format!("Failed to process {}", input.display()))?;

    for (reason, count) in &summary.ingest.rejected {
        info!(%reason, count, "rejected records");
    }
    info!(
        lines = summary.ingest.lines_read,
        accepted = summary.ingest.accepted,
        emitted = summary.rows_emitted,
        donors = summary.donors,
        buckets = summary.buckets,
        output = %output.display(),
        "run complete"
    );
    Ok(())
}
