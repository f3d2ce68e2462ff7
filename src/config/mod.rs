//! Configuration for a study run.
//!
//! A run is described by one [`StudyConfig`], read from a JSON file. Each
//! day-level worker receives its own [`WorkerConfig`] built from it; nothing
//! is shared through globals.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{NhError, Result};
use crate::models::AnchorPolicy;

/// Environment variable overriding the configured partition count
pub const PARTITIONS_ENV: &str = "NH_PARTITIONS";

/// Default gap, in days, after an anticipated-return discharge before a
/// re-entry starts a new admission-anchored episode
pub const DEFAULT_RETURN_GAP_DAYS: i64 = 30;

/// Locations of the four input tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    pub assessments: PathBuf,
    pub enrollment: PathBuf,
    pub hospital: PathBuf,
    pub snf: PathBuf,
}

/// Qualifying raw codes for the three monthly enrollment indicators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentCodes {
    /// HMO indicator values meaning fee-for-service
    pub ffs: Vec<String>,
    /// Buy-in indicator values meaning Part A and Part B coverage
    pub part_ab: Vec<String>,
    /// Leading characters of a Part D contract id that mean coverage
    pub part_d_prefixes: Vec<char>,
}

impl Default for EnrollmentCodes {
    fn default() -> Self {
        Self {
            ffs: vec!["0".to_string(), "4".to_string()],
            part_ab: vec!["3".to_string(), "C".to_string()],
            part_d_prefixes: vec!['H', 'R', 'S', 'E'],
        }
    }
}

impl EnrollmentCodes {
    #[must_use]
    pub fn is_ffs(&self, code: Option<&str>) -> bool {
        code.is_some_and(|c| self.ffs.iter().any(|q| q == c.trim()))
    }

    #[must_use]
    pub fn is_part_ab(&self, code: Option<&str>) -> bool {
        code.is_some_and(|c| self.part_ab.iter().any(|q| q == c.trim()))
    }

    #[must_use]
    pub fn is_part_d(&self, contract: Option<&str>) -> bool {
        contract
            .and_then(|c| c.trim().chars().next())
            .is_some_and(|first| self.part_d_prefixes.contains(&first.to_ascii_uppercase()))
    }
}

/// Study window bounds used by every builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub lookback: NaiveDate,
    pub return_gap_days: i64,
}

impl StudyWindow {
    /// Window with the default return gap
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate, lookback: NaiveDate) -> Self {
        Self {
            start,
            end,
            lookback,
            return_gap_days: DEFAULT_RETURN_GAP_DAYS,
        }
    }
}

/// Configuration for a complete study run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// First day of the study window
    pub study_start: NaiveDate,
    /// Last day of the study window; open stays are imputed to end here
    pub study_end: NaiveDate,
    /// Earliest date a record may reach back to
    pub lookback_date: NaiveDate,
    pub inputs: InputPaths,
    /// Directory receiving published tables and the run work area
    pub output_dir: PathBuf,
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    #[serde(default = "default_run_id")]
    pub run_id: String,
    #[serde(default = "default_return_gap_days")]
    pub return_gap_days: i64,
    /// Accepted assessment reporting codes; `None` accepts every record
    #[serde(default)]
    pub accepted_reporting_codes: Option<Vec<String>>,
    #[serde(default)]
    pub enrollment_codes: EnrollmentCodes,
}

fn default_partitions() -> usize {
    num_cpus::get()
}

fn default_run_id() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

const fn default_return_gap_days() -> i64 {
    DEFAULT_RETURN_GAP_DAYS
}

impl StudyConfig {
    /// Read a configuration file, apply environment overrides and validate it
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| NhError::io(path, e))?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `NH_PARTITIONS` when it holds a positive integer
    pub fn apply_env(&mut self) {
        if let Some(partitions) = std::env::var(PARTITIONS_ENV)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&p| p > 0)
        {
            self.partitions = partitions;
        }
    }

    /// Check window ordering and the partition count
    pub fn validate(&self) -> Result<()> {
        if self.study_end < self.study_start {
            return Err(NhError::config(format!(
                "study end {} precedes study start {}",
                self.study_end, self.study_start
            )));
        }
        if self.lookback_date > self.study_start {
            return Err(NhError::config(format!(
                "lookback date {} is after study start {}",
                self.lookback_date, self.study_start
            )));
        }
        if self.partitions == 0 {
            return Err(NhError::config("partition count must be at least 1"));
        }
        if self.return_gap_days < 0 {
            return Err(NhError::config("return gap must not be negative"));
        }
        if self.run_id.trim().is_empty() {
            return Err(NhError::config("run id must not be empty"));
        }
        Ok(())
    }

    #[must_use]
    pub const fn window(&self) -> StudyWindow {
        StudyWindow {
            start: self.study_start,
            end: self.study_end,
            lookback: self.lookback_date,
            return_gap_days: self.return_gap_days,
        }
    }

    /// Staging area for this run's intermediate tables and worker artifacts
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.output_dir.join("work").join(&self.run_id)
    }

    /// Configuration handed to the worker for one partition
    #[must_use]
    pub fn worker(&self, policy: AnchorPolicy, partition_index: usize) -> WorkerConfig {
        WorkerConfig {
            partition_index,
            partition_count: self.partitions,
            run_id: self.run_id.clone(),
            policy,
            work_dir: self.work_dir(),
        }
    }
}

impl fmt::Display for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study Configuration:")?;
        writeln!(f, "  Run Id: {}", self.run_id)?;
        writeln!(f, "  Study Window: {} to {}", self.study_start, self.study_end)?;
        writeln!(f, "  Lookback Date: {}", self.lookback_date)?;
        writeln!(f, "  Partitions: {}", self.partitions)?;
        writeln!(f, "  Return Gap Days: {}", self.return_gap_days)?;
        write!(f, "  Output Directory: {}", self.output_dir.display())
    }
}

/// Parameters of a single day-level worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub partition_index: usize,
    pub partition_count: usize,
    pub run_id: String,
    pub policy: AnchorPolicy,
    pub work_dir: PathBuf,
}

impl WorkerConfig {
    /// Unique artifact path for this worker's output
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir.join(format!(
            "{}_{}_part{:03}.parquet",
            self.run_id,
            self.policy.as_str(),
            self.partition_index
        ))
    }

    /// Completion status written next to the artifact
    #[must_use]
    pub fn status_path(&self) -> PathBuf {
        self.artifact_path().with_extension("status.json")
    }
}
