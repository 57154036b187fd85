use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use mast_gen::generate_with_config;
use mast_gen::lang::Lang;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod sample;
use crate::sample::{load_config, render, write_dataset, Format, Summary};

/// Sample a dataset of random, well-formed toy programs.
#[derive(Parser, Debug)]
struct Args {
    /// Path to .toml sampler configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Where to write the dataset; stdout when absent
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = Format::Tokens)]
    format: Format,

    /// Language to sample (minimp or imp)
    #[arg(short, long)]
    language: Option<Lang>,
    /// Number of programs
    #[arg(short = 'n', long)]
    dataset_size: Option<usize>,
    #[arg(long)]
    min_depth: Option<usize>,
    #[arg(long)]
    max_depth: Option<usize>,
    /// Characters identifiers are drawn from
    #[arg(long)]
    alphabet: Option<String>,
    #[arg(long)]
    max_int: Option<i64>,
    /// How quickly operators give way to leaves as depth grows
    #[arg(long)]
    steepness: Option<f64>,
    #[arg(short, long)]
    seed: Option<u64>,
    /// Skip bracketing additions under divisions
    #[arg(long)]
    no_fix: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Args::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    // file first, flags on top
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(language) = cli.language {
        config.language = language;
    }
    if let Some(n) = cli.dataset_size {
        config.dataset_size = n;
    }
    if let Some(d) = cli.min_depth {
        config.min_depth = d;
    }
    if cli.max_depth.is_some() {
        config.max_depth = cli.max_depth;
    }
    if let Some(alphabet) = cli.alphabet {
        config.alphabet = alphabet;
    }
    if let Some(max_int) = cli.max_int {
        config.max_int = max_int;
    }
    if let Some(k) = cli.steepness {
        config.steepness = k;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.no_fix {
        config.fix_precedence = false;
    }

    info!(language = %config.language, size = config.dataset_size, "sampling");
    let samples = generate_with_config(&config).context("sampling dataset")?;

    match cli.output {
        Some(ref path) => write_dataset(path, &samples, cli.format)?,
        None => io::stdout()
            .lock()
            .write_all(render(&samples, cli.format).as_bytes())
            .context("writing dataset to stdout")?,
    }

    let summary = Summary::of(&samples);
    eprintln!(
        "{} {} {} programs, mean depth {:.2} (max {}), mean size {:.1}",
        "done".green().bold(),
        summary.count,
        config.language.to_string().cyan(),
        summary.mean_depth,
        summary.max_depth,
        summary.mean_size
    );
    if let Some(path) = cli.output {
        eprintln!("{} {}", "wrote".bold(), path.display());
    }
    Ok(())
}
