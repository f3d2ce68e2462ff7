//! Nursing-home residency episodes and drug-observable time
//!
//! Builds NH episodes from MDS assessments under two anchoring policies,
//! classifies them against Medicare enrollment, and expands partially
//! enrolled episodes to days to find the spans during which Part D drug
//! use is observable. Work is split across partitioned workers whose
//! artifacts are aggregated into the published tables.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod utils;

pub use config::{StudyConfig, StudyWindow, WorkerConfig};
pub use error::{NhError, Result};
pub use models::{AnchorPolicy, DrugObservableEpisode, EnrollCategory, NhEpisode};
pub use pipeline::{RunReport, WorkerStatus, aggregate, prepare, run, run_single_worker};
