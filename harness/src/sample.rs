use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use mast_gen::{Sample, SamplerConfig};

/// How samples are laid out in the output.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Format {
    /// One program per line, tokens separated by spaces.
    #[default]
    Tokens,
    /// Pretty-printed source, programs separated by a blank line.
    Source,
}

/// The config file if one is given, otherwise the defaults.
pub fn load_config(path: Option<&Path>) -> Result<SamplerConfig> {
    let Some(path) = path else {
        return Ok(SamplerConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    SamplerConfig::from_toml_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

pub fn render(samples: &[Sample], format: Format) -> String {
    let mut out = String::new();
    for s in samples {
        match format {
            Format::Tokens => out.push_str(&s.tokens.join(" ")),
            Format::Source => {
                out.push_str(&s.source);
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}

pub fn write_dataset(path: &Path, samples: &[Sample], format: Format) -> Result<()> {
    fs::write(path, render(samples, format))
        .with_context(|| format!("writing dataset to {}", path.display()))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean_depth: f64,
    pub max_depth: usize,
    pub mean_size: f64,
}

impl Summary {
    pub fn of(samples: &[Sample]) -> Self {
        let count = samples.len();
        let n = count.max(1) as f64;
        Self {
            count,
            mean_depth: samples.iter().map(|s| s.depth).sum::<usize>() as f64 / n,
            max_depth: samples.iter().map(|s| s.depth).max().unwrap_or(0),
            mean_size: samples.iter().map(|s| s.size).sum::<usize>() as f64 / n,
        }
    }
}
