//! Runtime configuration for gpu-translate.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically. Batch sizes, worker count, device budget, and
//! model shape knobs all live here.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "gpu-translate", about = "GPU-accelerated batched NMT inference")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Input file; reads stdin when omitted.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Batch formation sizes.
    pub batch: BatchConfig,

    /// Worker pool settings.
    pub workers: WorkerConfig,

    /// Device memory settings.
    pub device: DeviceConfig,

    /// Model shape knobs.
    pub model: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            workers: WorkerConfig::default(),
            device: DeviceConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

/// Two-stage batching sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Sentences per mini batch (one translation job).
    pub mini_batch: usize,

    /// Sentences accumulated before sorting by length. Only useful
    /// when ≥ mini_batch; not enforced.
    pub maxi_batch: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mini_batch: 8,
            maxi_batch: 64,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Concurrent translation jobs.
    pub threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { threads: 4 }
    }
}

/// Device memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device memory budget for tensors in bytes.
    pub memory_budget: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            memory_budget: 2 * 1024 * 1024 * 1024, // 2 GB
        }
    }
}

/// Model shape knobs consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Vocabulary size in tokens.
    pub vocab_size: usize,

    /// Hidden state width.
    pub hidden_dim: usize,

    /// Beam width for decoding.
    pub beam_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: 32768,
            hidden_dim: 512,
            beam_size: 5,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults
    /// when the file is missing.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Bytes the FP16 embedding table occupies on the device.
    pub fn embedding_bytes(&self) -> usize {
        self.model.vocab_size * self.model.hidden_dim * 2
    }
}
