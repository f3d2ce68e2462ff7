//! Day-level worker
//!
//! A worker runs the day-level engine over one partition and writes a
//! uniquely named artifact plus a completion status next to it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::algorithm::classify::ClassifiedEpisode;
use crate::algorithm::days::observable_episodes;
use crate::algorithm::partition::partition_slice;
use crate::config::WorkerConfig;
use crate::error::{NhError, Result};
use crate::models::DrugObservableEpisode;
use crate::pipeline::staging::StagedTables;
use crate::utils::io::write_table;
use crate::utils::logging::log_stage_complete;

/// Completion code of a successful worker
pub const SUCCESS_CODE: i32 = 0;
/// Completion code of a failed worker
pub const FAILURE_CODE: i32 = 1;

/// Outcome of one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub partition_index: usize,
    /// 0 on success
    pub code: i32,
    pub artifact: PathBuf,
    /// Drug-observable rows written
    pub rows: usize,
    pub message: Option<String>,
}

impl WorkerStatus {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Read a status file, `None` when the worker never reported
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).map_err(|e| NhError::io(path, e))?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| NhError::io(path, e))
    }
}

/// Run the engine over this worker's partition of `work`
///
/// `work` is the full day-level population of the worker's policy; the
/// enrollment and stay tables are restricted to the partition's
/// beneficiaries before the engine runs.
pub fn run_partition(
    config: &WorkerConfig,
    work: &[ClassifiedEpisode],
    staged: &StagedTables,
) -> Result<Vec<DrugObservableEpisode>> {
    if config.partition_index >= config.partition_count {
        return Err(NhError::Worker {
            run_id: config.run_id.clone(),
            partition_index: config.partition_index,
            message: format!("partition index out of range 0..{}", config.partition_count),
        });
    }

    let slice = partition_slice(work, config.partition_count, config.partition_index, |c| {
        c.episode.bene_id.as_str()
    });
    let benes: FxHashSet<&str> = slice.iter().map(|c| c.episode.bene_id.as_str()).collect();

    let enrollment: Vec<_> = staged
        .enrollment
        .iter()
        .filter(|e| benes.contains(e.bene_id.as_str()))
        .cloned()
        .collect();
    let hospital: Vec<_> = staged
        .hospital
        .iter()
        .filter(|s| benes.contains(s.bene_id.as_str()))
        .cloned()
        .collect();
    let snf: Vec<_> = staged
        .snf
        .iter()
        .filter(|s| benes.contains(s.bene_id.as_str()))
        .cloned()
        .collect();

    log::debug!(
        "Worker {} of run {} ({}): {} episodes for {} beneficiaries",
        config.partition_index,
        config.run_id,
        config.policy,
        slice.len(),
        benes.len()
    );
    observable_episodes(slice, &enrollment, &hospital, &snf)
}

/// Run one worker to completion and record its status
///
/// Never returns an error: failures are logged with the run id and partition
/// index and reported through the status code.
pub fn run_worker(
    config: &WorkerConfig,
    work: &[ClassifiedEpisode],
    staged: &StagedTables,
) -> WorkerStatus {
    let start = Instant::now();
    let artifact = config.artifact_path();

    let outcome = run_partition(config, work, staged).and_then(|rows| {
        write_table(&artifact, &rows)?;
        Ok(rows.len())
    });

    let status = match outcome {
        Ok(rows) => {
            log_stage_complete(
                &format!("Worker {} ({})", config.partition_index, config.policy),
                rows,
                start.elapsed(),
            );
            WorkerStatus {
                partition_index: config.partition_index,
                code: SUCCESS_CODE,
                artifact,
                rows,
                message: None,
            }
        }
        Err(e) => {
            log::error!(
                "Worker {} of run {} ({}) failed: {e}",
                config.partition_index,
                config.run_id,
                config.policy
            );
            if artifact.exists() {
                if let Err(remove) = std::fs::remove_file(&artifact) {
                    log::warn!("Could not remove stale artifact {}: {remove}", artifact.display());
                }
            }
            WorkerStatus {
                partition_index: config.partition_index,
                code: FAILURE_CODE,
                artifact,
                rows: 0,
                message: Some(e.to_string()),
            }
        }
    };

    if let Err(e) = status.write(&config.status_path()) {
        log::error!(
            "Worker {} of run {} could not record its status: {e}",
            config.partition_index,
            config.run_id
        );
    }
    status
}
