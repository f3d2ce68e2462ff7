//! Day-level intersection engine
//!
//! Expands NH episodes to one row per calendar day, joins each day against
//! the enrollment, hospital and SNF day sets, and collapses the observable
//! days back into [`DrugObservableEpisode`]s.

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithm::classify::ClassifiedEpisode;
use crate::algorithm::runs::{collapse_runs, follows};
use crate::error::{NhError, Result};
use crate::models::{DayRecord, DrugObservableEpisode, EnrollCategory, EnrollmentEpisode, Stay};

type DaySet<'a> = FxHashSet<(&'a str, NaiveDate)>;

/// Inclusive calendar days of `[start, end]`
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

fn expand<'a>(spans: impl Iterator<Item = (&'a str, NaiveDate, NaiveDate)>) -> DaySet<'a> {
    let mut days = DaySet::default();
    for (bene, start, end) in spans {
        days.extend(days_between(start, end).map(|day| (bene, day)));
    }
    days
}

/// (beneficiary, day) sets for the enrollment, hospital and SNF tables
///
/// Overlapping source stays collapse into a single entry per day.
#[derive(Debug, Default)]
pub struct DayTimelines<'a> {
    enrolled: DaySet<'a>,
    hospital: DaySet<'a>,
    snf: DaySet<'a>,
}

impl<'a> DayTimelines<'a> {
    #[must_use]
    pub fn new(enrollment: &'a [EnrollmentEpisode], hospital: &'a [Stay], snf: &'a [Stay]) -> Self {
        let stay_spans = |stays: &'a [Stay]| {
            stays
                .iter()
                .map(|s| (s.bene_id.as_str(), s.entry_date, s.discharge_date))
        };
        Self {
            enrolled: expand(
                enrollment
                    .iter()
                    .map(|e| (e.bene_id.as_str(), e.enroll_start, e.enroll_end)),
            ),
            hospital: expand(stay_spans(hospital)),
            snf: expand(stay_spans(snf)),
        }
    }

    #[must_use]
    pub fn enrolled(&self, bene_id: &str, day: NaiveDate) -> bool {
        self.enrolled.contains(&(bene_id, day))
    }

    #[must_use]
    pub fn in_hospital(&self, bene_id: &str, day: NaiveDate) -> bool {
        self.hospital.contains(&(bene_id, day))
    }

    #[must_use]
    pub fn in_snf(&self, bene_id: &str, day: NaiveDate) -> bool {
        self.snf.contains(&(bene_id, day))
    }
}

/// Expand NH episodes to day rows sorted by (beneficiary, episode, day)
///
/// Episodes without enrollment produce no rows. Fully enrolled episodes are
/// marked enrolled on every day without consulting the enrollment days.
#[must_use]
pub fn expand_days<'a>(
    episodes: &'a [ClassifiedEpisode],
    timelines: &DayTimelines<'_>,
) -> Vec<DayRecord<'a>> {
    let mut days: Vec<DayRecord<'a>> = episodes
        .iter()
        .filter(|c| c.category.needs_day_level())
        .flat_map(|c| {
            let bene_id = c.episode.bene_id.as_str();
            let full = c.category == EnrollCategory::FullEnrollment;
            days_between(c.episode.entry_date, c.episode.discharge_date).map(move |day| DayRecord {
                bene_id,
                nh_episode_id: c.episode.episode_id,
                day,
                enroll_day: full || timelines.enrolled(bene_id, day),
                hosp_day: timelines.in_hospital(bene_id, day),
                snf_day: timelines.in_snf(bene_id, day),
            })
        })
        .collect();

    days.sort_unstable_by(|a, b| {
        (a.bene_id, a.nh_episode_id, a.day).cmp(&(b.bene_id, b.nh_episode_id, b.day))
    });
    days.dedup_by(|a, b| (a.bene_id, a.nh_episode_id, a.day) == (b.bene_id, b.nh_episode_id, b.day));
    days
}

/// Collapse observable days into drug-observable episodes
///
/// `days` must be sorted by (beneficiary, episode, day) as returned by
/// [`expand_days`]. A run breaks on a missing day or a change of NH episode.
#[must_use]
pub fn collapse_observable_days(
    episodes: &[ClassifiedEpisode],
    days: &[DayRecord<'_>],
) -> Vec<DrugObservableEpisode> {
    let lookup: FxHashMap<(&str, u32), &ClassifiedEpisode> = episodes
        .iter()
        .map(|c| ((c.episode.bene_id.as_str(), c.episode.episode_id), c))
        .collect();

    let observable: Vec<DayRecord<'_>> = days.iter().copied().filter(DayRecord::is_observable).collect();

    collapse_runs(&observable, |run, next| {
        let open = run.first();
        open.bene_id == next.bene_id && open.nh_episode_id == next.nh_episode_id && follows(run, next)
    })
    .into_iter()
    .filter_map(|run| {
        let first = run.first();
        let classified = lookup.get(&(first.bene_id, first.nh_episode_id))?;
        let mut row = DrugObservableEpisode::for_episode(
            &classified.episode,
            classified.category,
            run.start,
            run.end,
        );
        if let Some(enrollment) = classified.enrollment_on(run.start) {
            row.enroll_start = Some(enrollment.enroll_start);
            row.enroll_end = Some(enrollment.enroll_end);
        }
        Some(row)
    })
    .collect()
}

/// Fail if two observable episodes of one NH episode touch or overlap
pub fn check_separated(rows: &[DrugObservableEpisode]) -> Result<()> {
    for pair in rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.bene_id != b.bene_id || a.nh_episode_id != b.nh_episode_id {
            continue;
        }
        if a.end_date.succ_opt().is_none_or(|next| b.start_date <= next) {
            return Err(NhError::MergeDefect {
                bene_id: a.bene_id.clone(),
                episode_id: a.nh_episode_id,
                detail: format!(
                    "observable runs {}..{} and {}..{} are not separated by a gap",
                    a.start_date, a.end_date, b.start_date, b.end_date
                ),
            });
        }
    }
    Ok(())
}

/// Run the engine over a batch of classified episodes
///
/// The enrollment, hospital and SNF tables only need to cover the
/// beneficiaries present in `episodes`.
pub fn observable_episodes(
    episodes: &[ClassifiedEpisode],
    enrollment: &[EnrollmentEpisode],
    hospital: &[Stay],
    snf: &[Stay],
) -> Result<Vec<DrugObservableEpisode>> {
    let timelines = DayTimelines::new(enrollment, hospital, snf);
    let days = expand_days(episodes, &timelines);
    let rows = collapse_observable_days(episodes, &days);
    check_separated(&rows)?;

    log::debug!(
        "Collapsed {} NH days from {} episodes into {} observable episodes",
        days.len(),
        episodes.len(),
        rows.len()
    );
    Ok(rows)
}
