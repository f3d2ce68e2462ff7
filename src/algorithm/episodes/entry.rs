//! Entry-anchored episodes
//!
//! Stays whose date spans overlap, directly or through a chain of other
//! stays, form one episode bounded by the earliest entry and the latest
//! discharge of the chain.

use chrono::NaiveDate;
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithm::episodes::death::apply_death_correction;
use crate::algorithm::runs::{Run, collapse_runs, overlaps};
use crate::algorithm::stats::BuildStats;
use crate::models::{EdPair, NhEpisode};

/// Build entry-anchored episodes from matched stays
pub fn build_entry_episodes(
    mut pairs: Vec<EdPair>,
    deaths: &FxHashMap<String, NaiveDate>,
    stats: &mut BuildStats,
) -> Vec<NhEpisode> {
    pairs.sort_by(|a, b| {
        (&a.bene_id, a.entry_date, a.discharge_date, a.return_anticipated, &a.facility_id).cmp(&(
            &b.bene_id,
            b.entry_date,
            b.discharge_date,
            b.return_anticipated,
            &b.facility_id,
        ))
    });

    let runs = collapse_runs(&pairs, |run, next| {
        run.first().bene_id == next.bene_id && overlaps(run, next)
    });

    let mut episodes = Vec::with_capacity(runs.len());
    let mut episode_id = 0u32;
    let mut previous_bene: Option<&str> = None;
    for run in &runs {
        let bene = run.first().bene_id.as_str();
        if previous_bene != Some(bene) {
            episode_id = 0;
            previous_bene = Some(bene);
        }
        episode_id += 1;
        episodes.push(episode_from_run(run, episode_id));
    }

    let episodes = drop_overlapping_beneficiaries(episodes, stats);
    apply_death_correction(episodes, deaths, stats)
}

/// Reduce a run of stays to one episode
///
/// Discharge attributes come from the stay that reaches the run's latest
/// discharge, preferring a return-not-anticipated discharge on ties. The
/// earliest admission assessment among all stays is attached.
fn episode_from_run(run: &Run<'_, EdPair>, episode_id: u32) -> NhEpisode {
    let representative = run
        .members
        .iter()
        .filter(|p| p.discharge_date == run.end)
        .min_by_key(|p| p.return_anticipated)
        .unwrap_or_else(|| run.last());

    let admission = run
        .members
        .iter()
        .filter_map(|p| p.admission_date.map(|date| (date, p.entry_date)))
        .min();

    NhEpisode {
        bene_id: representative.bene_id.clone(),
        episode_id,
        entry_date: run.start,
        discharge_date: run.end,
        discharge_type: representative.discharge_type,
        return_anticipated: representative.return_anticipated,
        no_discharge: representative.no_discharge,
        death_error: false,
        death_date: None,
        admission_date: admission.map(|(date, _)| date),
        admission_entry_date: admission.map(|(_, entry)| entry),
        enroll_category: None,
    }
}

/// Beneficiaries whose sorted episodes still share a day
#[must_use]
pub fn overlapping_beneficiaries(episodes: &[NhEpisode]) -> FxHashSet<String> {
    episodes
        .iter()
        .chunk_by(|e| e.bene_id.as_str())
        .into_iter()
        .filter_map(|(bene, group)| {
            let mut spans: Vec<(NaiveDate, NaiveDate)> =
                group.map(|e| (e.entry_date, e.discharge_date)).collect();
            spans.sort_unstable();
            spans
                .windows(2)
                .any(|w| w[1].0 <= w[0].1)
                .then(|| bene.to_string())
        })
        .collect()
}

/// Second collapse pass: remove every beneficiary whose episodes overlap
///
/// Such a beneficiary is excluded entirely rather than repaired.
fn drop_overlapping_beneficiaries(
    mut episodes: Vec<NhEpisode>,
    stats: &mut BuildStats,
) -> Vec<NhEpisode> {
    let flagged = overlapping_beneficiaries(&episodes);
    if !flagged.is_empty() {
        log::warn!(
            "Excluding {} beneficiaries with overlapping episodes after collapse",
            flagged.len()
        );
        stats.overlap_beneficiaries += flagged.len();
        episodes.retain(|e| !flagged.contains(&e.bene_id));
    }
    episodes
}
