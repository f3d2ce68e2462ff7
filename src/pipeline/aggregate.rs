//! Aggregation and publication
//!
//! Reads every worker artifact of a policy, concatenates and sorts them, and
//! publishes the final NH episode and drug-observable tables. Partitions
//! whose worker failed or never reported are listed as missing; the tables
//! are still written, incomplete.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::algorithm::stats::BuildStats;
use crate::config::StudyConfig;
use crate::error::{NhError, Result};
use crate::models::{
    AnchorPolicy, DrugObservableEpisode, PublishedNhEpisode, PublishedObservableEpisode,
};
use crate::pipeline::staging::{read_staged_episodes, read_stats, staged_config};
use crate::pipeline::worker::WorkerStatus;
use crate::utils::io::{read_table, write_table};
use crate::utils::logging::{log_stage_complete, log_warning};

/// Name of the run manifest inside the work directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Published NH episode table of one policy
#[must_use]
pub fn nh_episodes_output(output_dir: &Path, policy: AnchorPolicy) -> PathBuf {
    output_dir.join(format!("nh_episodes_{policy}.parquet"))
}

/// Published drug-observable table of one policy
#[must_use]
pub fn observable_output(output_dir: &Path, policy: AnchorPolicy) -> PathBuf {
    output_dir.join(format!("drug_observable_{policy}.parquet"))
}

/// Aggregation result for one anchoring policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub policy: AnchorPolicy,
    pub workers: Vec<WorkerStatus>,
    /// Partitions missing from the published table
    pub missing: Vec<usize>,
    pub episode_rows: usize,
    pub observable_rows: usize,
}

impl PolicyReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Per-run summary, also written as the run manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub partition_count: usize,
    pub stats: Option<BuildStats>,
    pub policies: Vec<PolicyReport>,
}

impl RunReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.policies.iter().all(PolicyReport::is_complete)
    }

    /// Read the manifest of a run
    pub fn read(work_dir: &Path) -> Result<Self> {
        let path = work_dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| NhError::io(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn write(&self, work_dir: &Path) -> Result<()> {
        let path = work_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| NhError::io(&path, e))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run {} ({} partitions)", self.run_id, self.partition_count)?;
        for report in &self.policies {
            write!(
                f,
                "\n  {}: {} NH episodes, {} drug-observable episodes",
                report.policy, report.episode_rows, report.observable_rows
            )?;
            if !report.is_complete() {
                write!(f, ", missing partitions {:?}", report.missing)?;
            }
        }
        Ok(())
    }
}

/// Read the artifacts of every successful worker of `policy`
///
/// Returns the concatenated rows, the status reported by each worker that
/// reported at all, and the missing partition indices.
pub fn collect_artifacts(
    config: &StudyConfig,
    policy: AnchorPolicy,
) -> Result<(Vec<DrugObservableEpisode>, Vec<WorkerStatus>, Vec<usize>)> {
    let mut rows = Vec::new();
    let mut statuses = Vec::with_capacity(config.partitions);
    let mut missing = Vec::new();

    for index in 0..config.partitions {
        let worker = config.worker(policy, index);
        let status = WorkerStatus::read(&worker.status_path())?;
        let artifact = worker.artifact_path();

        match &status {
            Some(s) if s.succeeded() && artifact.exists() => {
                rows.extend(read_table::<DrugObservableEpisode>(&artifact)?);
            }
            Some(s) if !s.succeeded() => {
                log_warning(
                    &format!(
                        "Partition {index} of run {} failed ({}), excluded",
                        config.run_id,
                        s.message.as_deref().unwrap_or("no message")
                    ),
                    Some(&artifact),
                );
                missing.push(index);
            }
            _ => {
                log_warning(
                    &format!("Partition {index} of run {} has no artifact", config.run_id),
                    Some(&artifact),
                );
                missing.push(index);
            }
        }
        statuses.extend(status);
    }
    Ok((rows, statuses, missing))
}

/// Sort and publish the tables of one policy
pub fn publish_policy(config: &StudyConfig, policy: AnchorPolicy) -> Result<PolicyReport> {
    let start = Instant::now();
    let (rows, workers, missing) = collect_artifacts(config, policy)?;

    let mut observable: Vec<PublishedObservableEpisode> =
        rows.iter().map(PublishedObservableEpisode::from).collect();
    observable.sort_by(|a, b| {
        (&a.bene_id, a.nh_entry_date, a.observable_start).cmp(&(
            &b.bene_id,
            b.nh_entry_date,
            b.observable_start,
        ))
    });

    let mut episodes: Vec<PublishedNhEpisode> = read_staged_episodes(&config.work_dir(), policy)?
        .iter()
        .map(PublishedNhEpisode::from)
        .collect();
    episodes.sort_by(|a, b| (&a.bene_id, a.entry_date).cmp(&(&b.bene_id, b.entry_date)));

    write_table(&nh_episodes_output(&config.output_dir, policy), &episodes)?;
    write_table(&observable_output(&config.output_dir, policy), &observable)?;

    if !missing.is_empty() {
        log::warn!(
            "Published {policy} tables of run {} are incomplete: {} of {} partitions missing",
            config.run_id,
            missing.len(),
            config.partitions
        );
    }
    log_stage_complete(&format!("Published {policy} tables"), observable.len(), start.elapsed());

    Ok(PolicyReport {
        policy,
        workers,
        missing,
        episode_rows: episodes.len(),
        observable_rows: observable.len(),
    })
}

/// Aggregate both policies and write the run manifest
///
/// Partitions are counted as recorded by `prepare`, not as configured.
pub fn aggregate(config: &StudyConfig) -> Result<RunReport> {
    let config = &staged_config(config)?;
    let work_dir = config.work_dir();
    let policies = AnchorPolicy::ALL
        .into_iter()
        .map(|policy| publish_policy(config, policy))
        .collect::<Result<Vec<_>>>()?;

    let report = RunReport {
        run_id: config.run_id.clone(),
        partition_count: config.partitions,
        stats: read_stats(&work_dir)?,
        policies,
    };
    report.write(&work_dir)?;
    Ok(report)
}
