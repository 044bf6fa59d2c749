use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use bitonic::device::CpuDevice;
use bitonic::{BitonicSorter, SortBuffer, is_sorted_non_decreasing};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Sample variant, chosen at startup.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Bitonic pass sequence on the reference compute device.
    #[default]
    Bitonic,
    /// Standard library sort over the same padded buffer.
    Host,
}

#[derive(Clone, Debug)]
pub struct SampleOutput {
    pub keys: Vec<u32>,
    pub padded_len: usize,
    pub passes: Option<usize>,
    pub host_time: Duration,
    pub device_time: Option<Duration>,
}

pub trait Sample {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, keys: Vec<u32>) -> anyhow::Result<()>;

    fn run(&mut self) -> anyhow::Result<SampleOutput>;
}

pub fn build_sample(config: &Config) -> Box<dyn Sample> {
    match config.sample.kind {
        SampleKind::Bitonic => {
            let device = CpuDevice::new()
                .with_thread_group_size(config.device.thread_group_size)
                .with_hazard_validation(config.device.validate_hazards);
            let sorter = BitonicSorter::new().with_profiling(config.device.profile);
            Box::new(BitonicSample::new(device, sorter))
        }
        SampleKind::Host => Box::new(HostSortSample::default()),
    }
}

pub struct BitonicSample {
    device: CpuDevice,
    sorter: BitonicSorter,
    keys: Option<Vec<u32>>,
}

impl BitonicSample {
    pub fn new(device: CpuDevice, sorter: BitonicSorter) -> Self {
        Self {
            device,
            sorter,
            keys: None,
        }
    }
}

impl Sample for BitonicSample {
    fn name(&self) -> &'static str {
        "bitonic"
    }

    fn initialize(&mut self, keys: Vec<u32>) -> anyhow::Result<()> {
        tracing::info!(
            keys = keys.len(),
            padded_len = bitonic::padded_len(keys.len()),
            "initialized bitonic sample"
        );
        self.keys = Some(keys);
        Ok(())
    }

    fn run(&mut self) -> anyhow::Result<SampleOutput> {
        let keys = self.keys.as_deref().context("sample was not initialized")?;

        let start = Instant::now();
        let report = self
            .sorter
            .sort(&mut self.device, keys)
            .context("bitonic sort failed")?;
        let host_time = start.elapsed();

        Ok(SampleOutput {
            keys: report.keys,
            padded_len: report.padded_len,
            passes: Some(report.passes),
            host_time,
            device_time: report.device_time,
        })
    }
}

#[derive(Default)]
pub struct HostSortSample {
    buffer: Option<SortBuffer>,
}

impl Sample for HostSortSample {
    fn name(&self) -> &'static str {
        "host"
    }

    fn initialize(&mut self, keys: Vec<u32>) -> anyhow::Result<()> {
        self.buffer = Some(SortBuffer::from_keys(&keys)?);
        Ok(())
    }

    fn run(&mut self) -> anyhow::Result<SampleOutput> {
        let mut buffer = self.buffer.clone().context("sample was not initialized")?;

        let start = Instant::now();
        buffer.as_mut_slice().sort_unstable();
        let host_time = start.elapsed();

        Ok(SampleOutput {
            padded_len: buffer.padded_len(),
            keys: buffer.into_keys(),
            passes: None,
            host_time,
            device_time: None,
        })
    }
}

/// Checks that `output` holds `expected_len` keys in ascending order.
pub fn verify(output: &SampleOutput, expected_len: usize) -> anyhow::Result<()> {
    if output.keys.len() != expected_len {
        bail!(
            "expected {expected_len} sorted keys, got {}",
            output.keys.len()
        );
    }
    if !is_sorted_non_decreasing(&output.keys) {
        let at = output
            .keys
            .windows(2)
            .position(|w| w[0] > w[1])
            .unwrap_or_default();
        bail!(
            "output is not sorted at index {at}: {} > {}",
            output.keys[at],
            output.keys[at + 1]
        );
    }
    Ok(())
}
