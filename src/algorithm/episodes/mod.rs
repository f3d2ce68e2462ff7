//! Nursing-home episode builder
//!
//! Turns assessment records into non-overlapping residency episodes under
//! both anchoring policies:
//!
//! 1. [`pairs`] splits records and matches entries with discharges and
//!    admission assessments.
//! 2. [`entry`] collapses overlapping stays into entry-anchored episodes.
//! 3. [`admission`] regroups entry-anchored episodes around admissions.
//!
//! Both policies finish with the date-of-death correction in [`death`].

pub mod admission;
pub mod death;
pub mod entry;
pub mod pairs;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::algorithm::stats::BuildStats;
use crate::config::StudyWindow;
use crate::models::{AnchorPolicy, AssessmentRecord, NhEpisode};

pub use admission::build_admission_episodes;
pub use death::apply_death_correction;
pub use entry::build_entry_episodes;
pub use pairs::{match_pairs, split_records};

/// Episodes for both anchoring policies plus the exclusion ledger
#[derive(Debug, Clone, Default)]
pub struct EpisodeSet {
    pub entry: Vec<NhEpisode>,
    pub admission: Vec<NhEpisode>,
    pub stats: BuildStats,
}

impl EpisodeSet {
    #[must_use]
    pub fn for_policy(&self, policy: AnchorPolicy) -> &[NhEpisode] {
        match policy {
            AnchorPolicy::Entry => &self.entry,
            AnchorPolicy::Admission => &self.admission,
        }
    }
}

/// Build entry- and admission-anchored episodes from raw assessment records
pub fn build_episodes(
    records: Vec<AssessmentRecord>,
    deaths: &FxHashMap<String, NaiveDate>,
    window: &StudyWindow,
    accepted_reporting_codes: Option<&[String]>,
) -> EpisodeSet {
    let mut stats = BuildStats::default();

    let split = split_records(records, window, accepted_reporting_codes, &mut stats);
    log::debug!(
        "Split assessments into {} entries, {} discharges, {} admissions",
        split.entries.len(),
        split.discharges.len(),
        split.admissions.len()
    );

    let pairs = match_pairs(split, window, &mut stats);
    let entry = build_entry_episodes(pairs, deaths, &mut stats);
    let admission = build_admission_episodes(&entry, deaths, window.return_gap_days, &mut stats);

    log::info!(
        "Built {} entry-anchored and {} admission-anchored episodes",
        entry.len(),
        admission.len()
    );
    stats.log("Episode builder");

    EpisodeSet {
        entry,
        admission,
        stats,
    }
}
