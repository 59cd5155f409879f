//! # Host Runtime
//!
//! Boots the kernel, admits programs and pumps clock pulses.
//!
//! ## Event Loop
//!
//! Each step advances the timer by one pulse and delivers every pending
//! pulse to the kernel as a clock tick. The loop ends when the CPU has no
//! work left or the tick limit is reached.

use core_types::ProcessId;
use kernel_api::{KernelApi, KernelError, LoadReceipt, TickOutcome};
use services_storage::{DiskImage, ImageError};
use sim_kernel::timer::SimTimerDevice;
use sim_kernel::{parse_program_text, BootError, KernelConfig, SimulatedKernel};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Host runtime errors
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Boot failed: {0}")]
    Boot(#[from] BootError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Disk image error: {0}")]
    Image(#[from] ImageError),

    #[error("Invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Program {index} rejected: {source}")]
    Program { index: usize, source: KernelError },
}

/// Host runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HostRuntimeConfig {
    /// Kernel boot configuration
    pub kernel: KernelConfig,
    /// Hex program texts, admitted in order
    pub programs: Vec<String>,
    /// Format the disk before admitting programs
    pub format: bool,
    /// Disk image to mount if present and to save on shutdown
    pub disk_image: Option<PathBuf>,
    /// Maximum ticks to deliver (0 = unlimited)
    pub max_ticks: u64,
    /// Schedule every admitted program before running
    pub run_all: bool,
}

impl Default for HostRuntimeConfig {
    fn default() -> Self {
        Self {
            kernel: KernelConfig::default(),
            programs: Vec::new(),
            format: false,
            disk_image: None,
            max_ticks: 10_000,
            run_all: true,
        }
    }
}

impl HostRuntimeConfig {
    /// Reads the kernel section from a JSON file
    ///
    /// Missing fields keep their defaults.
    pub fn load_kernel_config(path: impl AsRef<Path>) -> Result<KernelConfig, HostRuntimeError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// What a completed run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks delivered to the kernel
    pub ticks: u64,
    /// Ticks that executed no instruction
    pub idle_ticks: u64,
    /// Processes that left the CPU for good, in exit order
    pub exited: Vec<ProcessId>,
    /// Ticks that ended in a quantum expiry
    pub preemptions: u64,
}

/// Host runtime
pub struct HostRuntime {
    config: HostRuntimeConfig,
    kernel: SimulatedKernel,
    timer: SimTimerDevice,
    output: Vec<String>,
    summary: RunSummary,
}

impl HostRuntime {
    /// Boots the kernel
    ///
    /// An existing disk image is mounted as is; otherwise a blank disk of the
    /// configured geometry is used.
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        let kernel = match &config.disk_image {
            Some(path) if path.exists() => {
                let image = DiskImage::load(path)?;
                let disk = image.restore()?;
                SimulatedKernel::boot(config.kernel.clone(), disk)?
            }
            _ => SimulatedKernel::with_config(config.kernel.clone())?,
        };

        Ok(Self {
            config,
            kernel,
            timer: SimTimerDevice::new(),
            output: Vec::new(),
            summary: RunSummary::default(),
        })
    }

    pub fn kernel(&self) -> &SimulatedKernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut SimulatedKernel {
        &mut self.kernel
    }

    /// Console lines drained at the end of the last run
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Formats the disk if asked, then admits every configured program
    pub fn prepare(&mut self) -> Result<Vec<LoadReceipt>, HostRuntimeError> {
        if self.config.format {
            self.kernel.format_disk()?;
        }

        let mut receipts = Vec::with_capacity(self.config.programs.len());
        for (index, text) in self.config.programs.iter().enumerate() {
            let receipt = parse_program_text(text)
                .and_then(|image| self.kernel.load(&image))
                .map_err(|source| HostRuntimeError::Program { index, source })?;
            receipts.push(receipt);
        }

        if self.config.run_all {
            self.kernel.run_all();
        }
        Ok(receipts)
    }

    /// Runs the host event loop
    ///
    /// Returns when:
    /// - The CPU has no work left
    /// - Max ticks reached (if configured)
    pub fn run(&mut self) -> Result<&RunSummary, HostRuntimeError> {
        let mut result = Ok(());
        while result.is_ok() {
            if !self.kernel.is_executing() {
                break;
            }
            if self.config.max_ticks > 0 && self.summary.ticks >= self.config.max_ticks {
                break;
            }
            result = self.step();
        }

        self.drain_console();
        result.map(|()| &self.summary)
    }

    /// Executes one step of the event loop
    pub fn step(&mut self) -> Result<(), HostRuntimeError> {
        self.timer.advance_ticks(1);
        for _ in 0..self.timer.take_pending() {
            let outcome = self.kernel.clock_tick()?;
            self.record(outcome);
        }
        Ok(())
    }

    /// Saves the disk image if one is configured
    pub fn shutdown(&mut self) -> Result<(), HostRuntimeError> {
        self.drain_console();
        if let Some(path) = &self.config.disk_image {
            let image = self.kernel.capture_disk()?;
            image.save(path)?;
        }
        Ok(())
    }

    fn record(&mut self, outcome: TickOutcome) {
        self.summary.ticks += 1;
        match outcome {
            TickOutcome::Idle => self.summary.idle_ticks += 1,
            TickOutcome::Executed(_) => {}
            TickOutcome::Preempted(_) => self.summary.preemptions += 1,
            TickOutcome::Exited { pid, .. } => self.summary.exited.push(pid),
        }
    }

    fn drain_console(&mut self) {
        self.output.extend(self.kernel.take_output());
    }
}
