//! Build stage and its staging tables
//!
//! `prepare` turns the raw inputs into classified NH episodes, enrollment
//! episodes and cleaned stays, and writes them under the run's work
//! directory so that any single worker can be rerun from disk.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::algorithm::classify::{ClassifiedEpisode, classify_episodes};
use crate::algorithm::enrollment::{build_enrollment_episodes, death_dates};
use crate::algorithm::episodes::build_episodes;
use crate::algorithm::stats::BuildStats;
use crate::algorithm::stays::clean_stays;
use crate::config::StudyConfig;
use crate::error::{NhError, Result};
use crate::models::{AnchorPolicy, EnrollmentEpisode, NhEpisode, Stay, StayKind};
use crate::pipeline::aggregate::MANIFEST_FILE;
use crate::pipeline::loader::InputTables;
use crate::utils::io::{read_table, write_table};
use crate::utils::logging::{log_operation_start, log_stage_complete};

const ENROLLMENT_FILE: &str = "enrollment_episodes.parquet";
const HOSPITAL_FILE: &str = "hospital_stays.parquet";
const SNF_FILE: &str = "snf_stays.parquet";
const STATS_FILE: &str = "build_stats.json";
const STAGING_FILE: &str = "staging.json";

/// Staged NH episode table of one policy
#[must_use]
pub fn episodes_path(work_dir: &Path, policy: AnchorPolicy) -> PathBuf {
    work_dir.join(format!("nh_episodes_{policy}.parquet"))
}

/// Everything the day-level workers need
#[derive(Debug, Clone, Default)]
pub struct StagedTables {
    pub entry: Vec<ClassifiedEpisode>,
    pub admission: Vec<ClassifiedEpisode>,
    pub enrollment: Vec<EnrollmentEpisode>,
    pub hospital: Vec<Stay>,
    pub snf: Vec<Stay>,
    pub stats: BuildStats,
}

impl StagedTables {
    /// Run every builder over the raw inputs
    #[must_use]
    pub fn build(inputs: InputTables, config: &StudyConfig) -> Self {
        let start = Instant::now();
        let window = config.window();

        let deaths = death_dates(&inputs.enrollment);
        let enrollment = build_enrollment_episodes(&inputs.enrollment, &config.enrollment_codes);
        let episodes = build_episodes(
            inputs.assessments,
            &deaths,
            &window,
            config.accepted_reporting_codes.as_deref(),
        );

        let mut stats = episodes.stats;
        let hospital = clean_stays(inputs.hospital, StayKind::Hospital, &window, &mut stats);
        let snf = clean_stays(inputs.snf, StayKind::Snf, &window, &mut stats);

        let entry = classify_episodes(&episodes.entry, &enrollment);
        let admission = classify_episodes(&episodes.admission, &enrollment);

        log_stage_complete("Built staging tables", entry.len() + admission.len(), start.elapsed());
        stats.log("Build");
        Self {
            entry,
            admission,
            enrollment,
            hospital,
            snf,
            stats,
        }
    }

    #[must_use]
    pub fn episodes(&self, policy: AnchorPolicy) -> &[ClassifiedEpisode] {
        match policy {
            AnchorPolicy::Entry => &self.entry,
            AnchorPolicy::Admission => &self.admission,
        }
    }

    /// Episodes the day-level engine has to process, grouped by beneficiary
    ///
    /// One row per NH episode, ordered by (beneficiary, episode id).
    #[must_use]
    pub fn day_level_work(&self, policy: AnchorPolicy) -> Vec<ClassifiedEpisode> {
        let mut work: Vec<ClassifiedEpisode> = self
            .episodes(policy)
            .iter()
            .filter(|c| c.category.needs_day_level())
            .cloned()
            .collect();
        work.sort_by(|a, b| {
            (&a.episode.bene_id, a.episode.episode_id).cmp(&(&b.episode.bene_id, b.episode.episode_id))
        });
        work.dedup_by(|a, b| {
            a.episode.bene_id == b.episode.bene_id && a.episode.episode_id == b.episode.episode_id
        });
        work
    }

    /// Write the staging tables to `work_dir`
    pub fn write(&self, work_dir: &Path) -> Result<()> {
        log_operation_start("Writing staging tables to", work_dir);
        for policy in AnchorPolicy::ALL {
            let episodes: Vec<NhEpisode> =
                self.episodes(policy).iter().map(|c| c.episode.clone()).collect();
            write_table(&episodes_path(work_dir, policy), &episodes)?;
        }
        write_table(&work_dir.join(ENROLLMENT_FILE), &self.enrollment)?;
        write_table(&work_dir.join(HOSPITAL_FILE), &self.hospital)?;
        write_table(&work_dir.join(SNF_FILE), &self.snf)?;

        let stats_path = work_dir.join(STATS_FILE);
        let json = serde_json::to_string_pretty(&self.stats)?;
        std::fs::write(&stats_path, json).map_err(|e| NhError::io(&stats_path, e))?;
        Ok(())
    }

    /// Read staging tables written by [`StagedTables::write`]
    ///
    /// NH episodes are classified again against the staged enrollment
    /// episodes to recover the overlapping enrollment episodes.
    pub fn read(work_dir: &Path) -> Result<Self> {
        log_operation_start("Reading staging tables from", work_dir);
        let enrollment: Vec<EnrollmentEpisode> = read_table(&work_dir.join(ENROLLMENT_FILE))?;
        let entry: Vec<NhEpisode> = read_table(&episodes_path(work_dir, AnchorPolicy::Entry))?;
        let admission: Vec<NhEpisode> = read_table(&episodes_path(work_dir, AnchorPolicy::Admission))?;

        Ok(Self {
            entry: classify_episodes(&entry, &enrollment),
            admission: classify_episodes(&admission, &enrollment),
            hospital: read_table(&work_dir.join(HOSPITAL_FILE))?,
            snf: read_table(&work_dir.join(SNF_FILE))?,
            stats: read_stats(work_dir)?.unwrap_or_default(),
            enrollment,
        })
    }
}

/// Run identity recorded when the staging tables are written
///
/// Workers and aggregation take the partition count from here, so a rerun
/// with a different configured count still sees the partitioning the
/// staging tables were split for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingManifest {
    pub run_id: String,
    pub partition_count: usize,
}

impl StagingManifest {
    #[must_use]
    pub fn new(config: &StudyConfig) -> Self {
        Self {
            run_id: config.run_id.clone(),
            partition_count: config.partitions,
        }
    }

    pub fn read(work_dir: &Path) -> Result<Self> {
        let path = work_dir.join(STAGING_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| NhError::io(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write(&self, work_dir: &Path) -> Result<()> {
        let path = work_dir.join(STAGING_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| NhError::io(&path, e))
    }

    /// `config` with the staged partition count
    ///
    /// Fails when the staging area belongs to another run.
    pub fn apply(&self, config: &StudyConfig) -> Result<StudyConfig> {
        if self.run_id != config.run_id {
            return Err(NhError::config(format!(
                "staging area {} belongs to run {}, not {}",
                config.work_dir().display(),
                self.run_id,
                config.run_id
            )));
        }
        if self.partition_count != config.partitions {
            log::warn!(
                "Run {} was staged for {} partitions, ignoring configured {}",
                self.run_id,
                self.partition_count,
                config.partitions
            );
        }
        Ok(StudyConfig {
            partitions: self.partition_count,
            ..config.clone()
        })
    }
}

/// `config` adjusted to the partitioning its staging area was written for
pub fn staged_config(config: &StudyConfig) -> Result<StudyConfig> {
    StagingManifest::read(&config.work_dir())?.apply(config)
}

/// Remove worker artifacts, status files and the run manifest of `run_id`
///
/// Returns the number of files removed.
pub fn clear_worker_outputs(work_dir: &Path, run_id: &str) -> Result<usize> {
    if !work_dir.exists() {
        return Ok(0);
    }
    let prefix = format!("{run_id}_");
    let mut removed = 0;
    for entry in std::fs::read_dir(work_dir).map_err(|e| NhError::io(work_dir, e))? {
        let path = entry.map_err(|e| NhError::io(work_dir, e))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let worker_output = name.starts_with(&prefix)
            && name.contains("_part")
            && (name.ends_with(".parquet") || name.ends_with(".status.json"));
        if worker_output || name == MANIFEST_FILE {
            std::fs::remove_file(&path).map_err(|e| NhError::io(&path, e))?;
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!("Removed {removed} stale outputs of run {run_id} from {}", work_dir.display());
    }
    Ok(removed)
}

/// Exclusion ledger of the build stage, if one was written
pub fn read_stats(work_dir: &Path) -> Result<Option<BuildStats>> {
    let path = work_dir.join(STATS_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|e| NhError::io(&path, e))?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// Read the staged NH episodes of one policy without classifying them
pub fn read_staged_episodes(work_dir: &Path, policy: AnchorPolicy) -> Result<Vec<NhEpisode>> {
    read_table(&episodes_path(work_dir, policy))
}
