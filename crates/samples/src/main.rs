mod config;
mod input;
mod sample;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::input::{KeyDistribution, generate_keys};
use crate::sample::{SampleKind, build_sample, verify};

const KEYS_PER_LINE: usize = 16;

#[derive(Parser)]
#[command(name = "bitonic-samples")]
#[command(about = "Bitonic sort compute samples", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file.
    /// Searches bitonic-samples.toml and config/bitonic-samples.toml by default.
    #[arg(short, long, env = "BITONIC_CONFIG")]
    config: Option<PathBuf>,

    /// Sample variant to run
    #[arg(short, long, value_enum)]
    sample: Option<SampleKind>,

    /// Number of keys to sort
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Seed for key generation
    #[arg(long)]
    seed: Option<u64>,

    /// Key distribution
    #[arg(long, value_enum)]
    distribution: Option<KeyDistribution>,

    /// Threads per group on the compute device
    #[arg(long)]
    thread_group_size: Option<u32>,

    /// Skip read/write hazard validation on the compute device
    #[arg(long)]
    no_hazard_validation: bool,

    /// Do not bracket the passes with timestamps
    #[arg(long)]
    no_profile: bool,

    /// Print the sorted keys
    #[arg(short, long)]
    print: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(kind) = self.sample {
            config.sample.kind = kind;
        }
        if let Some(count) = self.count {
            config.input.count = count;
        }
        if let Some(seed) = self.seed {
            config.input.seed = seed;
        }
        if let Some(distribution) = self.distribution {
            config.input.distribution = distribution;
        }
        if let Some(size) = self.thread_group_size {
            config.device.thread_group_size = size;
        }
        if self.no_hazard_validation {
            config.device.validate_hazards = false;
        }
        if self.no_profile {
            config.device.profile = false;
        }
        if self.print {
            config.output.print = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref()).context("failed to load configuration")?;
    cli.apply(&mut config);

    run(&config)
}

fn run(config: &Config) -> anyhow::Result<()> {
    let keys = generate_keys(
        config.input.count,
        config.input.seed,
        config.input.distribution,
    )?;
    tracing::info!(
        count = keys.len(),
        seed = config.input.seed,
        distribution = config.input.distribution.label(),
        "generated keys"
    );

    let mut sample = build_sample(config);
    sample
        .initialize(keys)
        .with_context(|| format!("failed to initialize {} sample", sample.name()))?;
    let output = sample
        .run()
        .with_context(|| format!("{} sample failed", sample.name()))?;
    verify(&output, config.input.count)?;

    tracing::info!(
        sample = sample.name(),
        keys = output.keys.len(),
        padded_len = output.padded_len,
        passes = ?output.passes,
        host_time = ?output.host_time,
        device_time = ?output.device_time,
        "sorted"
    );

    if config.output.print {
        for line in output.keys.chunks(KEYS_PER_LINE) {
            let line: Vec<String> = line.iter().map(u32::to_string).collect();
            println!("{}", line.join(" "));
        }
    }
    Ok(())
}
