//! # Batch Runner
//!
//! Feeds a batch of calls to the module one at a time. Acting as the
//! caller, the host fills in any witness an entry leaves out from the
//! module's current state, so a batch can be written without precomputed
//! Merkle paths.

use std::fs;
use std::io::Write;
use std::path::Path;

use analysis_service::{
    AccountRecord, AnalysisService, AnalysisServiceApi, CallOutcome, InclusionPath,
    ModuleConfig, ModuleSnapshot, RejectionKind, RejectionPayload, RuntimeCall, ServiceStats,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Balance, Hash, Identity, TokenId};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;

/// One batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BatchEntry {
    /// Gated transition for `identity`. A missing `account` or `path` is
    /// taken from the module's current state.
    Analysis {
        identity: Identity,
        #[serde(default)]
        account: Option<AccountRecord>,
        #[serde(default)]
        path: Option<InclusionPath>,
        counter: u64,
        #[serde(default)]
        token_id: TokenId,
    },
    AddBalance {
        caller: Identity,
        #[serde(default)]
        token_id: TokenId,
        address: Identity,
        amount: Balance,
    },
}

/// Result of a batch run.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<CallOutcome>,
    #[serde_as(as = "Hex")]
    pub final_root: Hash,
    pub stats: ServiceStats,
}

/// Drives any [`AnalysisServiceApi`] through a batch.
pub struct BatchRunner<'a, A: AnalysisServiceApi> {
    api: &'a mut A,
    /// Entries rejected before reaching the module.
    host_rejections: u64,
}

impl<'a, A: AnalysisServiceApi> BatchRunner<'a, A> {
    pub fn new(api: &'a mut A) -> Self {
        Self {
            api,
            host_rejections: 0,
        }
    }

    /// Execute entries in order. Rejections are recorded and the batch
    /// continues.
    pub fn run(&mut self, entries: impl IntoIterator<Item = BatchEntry>) -> Vec<CallOutcome> {
        entries.into_iter().map(|entry| self.run_entry(entry)).collect()
    }

    /// Entries the runner rejected itself because no witness could be built.
    pub fn host_rejections(&self) -> u64 {
        self.host_rejections
    }

    fn run_entry(&mut self, entry: BatchEntry) -> CallOutcome {
        match self.resolve(entry) {
            Ok(call) => self.api.execute(call),
            Err(rejection) => {
                self.host_rejections += 1;
                warn!(kind = ?rejection.kind, message = %rejection.message, "Entry rejected by host");
                CallOutcome::Rejected(rejection)
            }
        }
    }

    /// Turn an entry into a call, filling a missing witness from current state.
    fn resolve(&self, entry: BatchEntry) -> Result<RuntimeCall, RejectionPayload> {
        match entry {
            BatchEntry::Analysis {
                identity,
                account,
                path,
                counter,
                token_id,
            } => {
                let account = account
                    .or_else(|| self.api.account(&identity))
                    .ok_or_else(|| unknown_identity(&identity))?;
                let path = path
                    .or_else(|| self.api.inclusion_path(&identity))
                    .ok_or_else(|| unknown_identity(&identity))?;
                debug!(%identity, url = account.url, counter, "Submitting analysis");
                Ok(RuntimeCall::Analysis {
                    account,
                    path,
                    counter,
                    token_id,
                })
            }
            BatchEntry::AddBalance {
                caller,
                token_id,
                address,
                amount,
            } => Ok(RuntimeCall::AddBalance {
                caller,
                token_id,
                address,
                amount,
            }),
        }
    }
}

fn unknown_identity(identity: &Identity) -> RejectionPayload {
    RejectionPayload {
        kind: RejectionKind::ProofVerificationFailed,
        message: format!("No registry leaf for {identity}"),
    }
}

/// Bootstrap the module, restore any snapshot, run the batch and persist.
pub fn run_node(config: &NodeConfig) -> Result<BatchReport> {
    let module_config = ModuleConfig::from_file(&config.module_config).with_context(|| {
        format!(
            "loading module configuration from {}",
            config.module_config.display()
        )
    })?;
    let mut service =
        AnalysisService::bootstrap(module_config).context("bootstrapping analysis module")?;

    if let Some(snapshot_path) = &config.snapshot {
        if snapshot_path.exists() {
            restore_snapshot(&mut service, snapshot_path)?;
        }
    }

    let entries = load_batch(&config.batch)?;
    info!(calls = entries.len(), "Executing batch");
    let mut runner = BatchRunner::new(&mut service);
    let outcomes = runner.run(entries);
    let host_rejections = runner.host_rejections();

    if let Some(snapshot_path) = &config.snapshot {
        let bytes = service.snapshot().to_bytes()?;
        write_snapshot(snapshot_path, &bytes)?;
        info!(path = %snapshot_path.display(), "Snapshot written");
    }

    let mut stats = service.stats();
    stats.calls_rejected += host_rejections;
    info!(
        committed = stats.transitions_committed,
        minted = stats.mints,
        rejected = stats.calls_rejected,
        "Batch complete"
    );

    Ok(BatchReport {
        outcomes,
        final_root: service.current_root(),
        stats,
    })
}

pub fn load_batch(path: &Path) -> Result<Vec<BatchEntry>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading batch from {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing batch {}", path.display()))
}

/// Replace the file at `path` with `bytes`. The bytes go to a temporary
/// file in the same directory, which is then renamed over `path`, so a
/// reader sees either the old snapshot or the new one.
pub fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary snapshot in {}", dir.display()))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("writing temporary snapshot {}", tmp.path().display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("writing snapshot to {}", path.display()))?;
    Ok(())
}

fn restore_snapshot(service: &mut AnalysisService, path: &Path) -> Result<()> {
    let bytes =
        fs::read(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot = ModuleSnapshot::from_bytes(&bytes)?;
    service
        .restore(snapshot)
        .with_context(|| format!("restoring snapshot {}", path.display()))?;
    info!(
        path = %path.display(),
        root = %hex::encode(service.current_root()),
        "Snapshot restored"
    );
    Ok(())
}
