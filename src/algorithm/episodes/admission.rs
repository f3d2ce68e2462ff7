//! Admission-anchored episodes
//!
//! Consecutive entry-anchored episodes belong to one admission-anchored
//! episode while each discharge anticipated a return and the resident came
//! back within the return gap. Each group starts at its first qualifying
//! admission assessment; episodes before it are dropped.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::algorithm::episodes::death::apply_death_correction;
use crate::algorithm::runs::{Run, collapse_runs};
use crate::algorithm::stats::BuildStats;
use crate::models::{NhEpisode, ReturnAnticipated};

/// Whether `next` continues the admission that `previous` belongs to
#[must_use]
pub fn continues_admission(previous: &NhEpisode, next: &NhEpisode, return_gap_days: i64) -> bool {
    if previous.bene_id != next.bene_id {
        return false;
    }
    match previous.return_anticipated {
        ReturnAnticipated::NotAnticipated => false,
        ReturnAnticipated::Anticipated => {
            (next.entry_date - previous.discharge_date).num_days() <= return_gap_days
        }
        ReturnAnticipated::NoDischarge => true,
    }
}

/// Build admission-anchored episodes from entry-anchored ones
pub fn build_admission_episodes(
    entry_episodes: &[NhEpisode],
    deaths: &FxHashMap<String, NaiveDate>,
    return_gap_days: i64,
    stats: &mut BuildStats,
) -> Vec<NhEpisode> {
    let mut sorted = entry_episodes.to_vec();
    sorted.sort_by(|a, b| (&a.bene_id, a.entry_date).cmp(&(&b.bene_id, b.entry_date)));

    let groups = collapse_runs(&sorted, |run, next| {
        continues_admission(run.last(), next, return_gap_days)
    });

    let mut episodes = Vec::with_capacity(groups.len());
    let mut episode_id = 0u32;
    let mut previous_bene: Option<&str> = None;
    for group in &groups {
        let Some(episode) = collapse_group(group, stats) else {
            continue;
        };
        if previous_bene != Some(group.first().bene_id.as_str()) {
            episode_id = 0;
            previous_bene = Some(group.first().bene_id.as_str());
        }
        episode_id += 1;
        episodes.push(NhEpisode {
            episode_id,
            ..episode
        });
    }

    apply_death_correction(episodes, deaths, stats)
}

/// Collapse one group to its admission-anchored episode
///
/// Returns `None` when no episode in the group carries an admission
/// assessment.
fn collapse_group(group: &Run<'_, NhEpisode>, stats: &mut BuildStats) -> Option<NhEpisode> {
    let Some(first_admitted) = group
        .members
        .iter()
        .position(|e| e.admission_date.is_some())
    else {
        stats.before_admission += group.len();
        return None;
    };
    stats.before_admission += first_admitted;

    let retained = &group.members[first_admitted..];
    let anchor = &retained[0];
    let last = &retained[retained.len() - 1];
    let discharge_date = retained
        .iter()
        .map(|e| e.discharge_date)
        .max()
        .unwrap_or(last.discharge_date);

    Some(NhEpisode {
        bene_id: anchor.bene_id.clone(),
        episode_id: 0,
        entry_date: anchor.admission_entry_date.unwrap_or(anchor.entry_date),
        discharge_date,
        discharge_type: last.discharge_type,
        return_anticipated: last.return_anticipated,
        no_discharge: last.no_discharge,
        death_error: last.death_error,
        death_date: None,
        admission_date: anchor.admission_date,
        admission_entry_date: anchor.admission_entry_date,
        enroll_category: None,
    })
}
