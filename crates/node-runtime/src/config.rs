//! # Node Configuration
//!
//! Runtime options of the host binary. Each option is read from the
//! environment and may be overridden on the command line:
//!
//! | Option | Env var | Flag |
//! |--------|---------|------|
//! | Module configuration file | `AS_CONFIG` | `--config` |
//! | Batch file | `AS_BATCH` | `--batch` |
//! | Snapshot file | `AS_SNAPSHOT` | `--snapshot` |
//! | Default log level | `AS_LOG_LEVEL` | `--log-level` |
//!
//! `RUST_LOG` takes precedence over the default log level.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "node-runtime")]
#[command(about = "Execute a batch of calls against the analysis module")]
pub struct Args {
    /// Module configuration JSON
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Batch of calls (JSON array)
    #[arg(short, long)]
    pub batch: Option<PathBuf>,

    /// Snapshot file: restored from when present, written after the batch
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeConfigError {
    #[error("Missing {option}: pass --{flag} or set {env}")]
    Missing {
        option: &'static str,
        flag: &'static str,
        env: &'static str,
    },
}

/// Resolved runtime options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub module_config: PathBuf,
    pub batch: PathBuf,
    pub snapshot: Option<PathBuf>,
    pub log_level: String,
}

impl NodeConfig {
    /// Resolve from process environment and `args`.
    pub fn load(args: Args) -> Result<Self, NodeConfigError> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Resolve with `env` as the variable source. Arguments win over `env`.
    pub fn resolve(
        args: Args,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, NodeConfigError> {
        let module_config = args
            .config
            .or_else(|| env("AS_CONFIG").map(PathBuf::from))
            .ok_or(NodeConfigError::Missing {
                option: "module configuration",
                flag: "config",
                env: "AS_CONFIG",
            })?;
        let batch = args
            .batch
            .or_else(|| env("AS_BATCH").map(PathBuf::from))
            .ok_or(NodeConfigError::Missing {
                option: "batch file",
                flag: "batch",
                env: "AS_BATCH",
            })?;
        let snapshot = args
            .snapshot
            .or_else(|| env("AS_SNAPSHOT").map(PathBuf::from));
        let log_level = args
            .log_level
            .or_else(|| env("AS_LOG_LEVEL"))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            module_config,
            batch,
            snapshot,
            log_level,
        })
    }
}
