//! Episode classifier
//!
//! Tags every NH episode with its relation to the beneficiary's enrollment
//! episodes and keeps the overlapping enrollment episodes for day-level work.

use smallvec::SmallVec;

use crate::algorithm::enrollment::index_by_beneficiary;
use crate::models::{EnrollCategory, EnrollmentEpisode, NhEpisode};

/// An NH episode with its enrollment category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEpisode {
    /// The episode, with `enroll_category` set
    pub episode: NhEpisode,
    pub category: EnrollCategory,
    /// Enrollment episodes sharing at least one day with the NH episode
    pub overlaps: SmallVec<[EnrollmentEpisode; 2]>,
}

impl ClassifiedEpisode {
    /// The enrollment episode containing `date`, if any
    #[must_use]
    pub fn enrollment_on(&self, date: chrono::NaiveDate) -> Option<&EnrollmentEpisode> {
        self.overlaps.iter().find(|e| e.contains(date))
    }
}

/// Category counts for one classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub none: usize,
    pub full: usize,
    pub partial: usize,
}

impl ClassificationSummary {
    #[must_use]
    pub fn of(classified: &[ClassifiedEpisode]) -> Self {
        classified
            .iter()
            .fold(Self::default(), |mut acc, c| {
                match c.category {
                    EnrollCategory::NoEnrollment => acc.none += 1,
                    EnrollCategory::FullEnrollment => acc.full += 1,
                    EnrollCategory::PartialEnrollment => acc.partial += 1,
                }
                acc
            })
    }
}

/// Decide the category from the overlapping enrollment episodes
#[must_use]
pub fn categorize(episode: &NhEpisode, overlaps: &[EnrollmentEpisode]) -> EnrollCategory {
    match overlaps {
        [] => EnrollCategory::NoEnrollment,
        [only] if only.covers(episode.entry_date, episode.discharge_date) => {
            EnrollCategory::FullEnrollment
        }
        _ => EnrollCategory::PartialEnrollment,
    }
}

/// Classify NH episodes of one anchoring policy
///
/// Output holds exactly one row per input episode, in input order.
#[must_use]
pub fn classify_episodes(
    episodes: &[NhEpisode],
    enrollment: &[EnrollmentEpisode],
) -> Vec<ClassifiedEpisode> {
    let index = index_by_beneficiary(enrollment);

    let classified: Vec<ClassifiedEpisode> = episodes
        .iter()
        .map(|episode| {
            let overlaps: SmallVec<[EnrollmentEpisode; 2]> = index
                .get(episode.bene_id.as_str())
                .into_iter()
                .flatten()
                .filter(|e| e.overlaps(episode.entry_date, episode.discharge_date))
                .map(|e| (*e).clone())
                .collect();
            let category = categorize(episode, &overlaps);
            ClassifiedEpisode {
                episode: NhEpisode {
                    enroll_category: Some(category),
                    ..episode.clone()
                },
                category,
                overlaps,
            }
        })
        .collect();

    let summary = ClassificationSummary::of(&classified);
    log::info!(
        "Classified {} episodes: {} without enrollment, {} fully enrolled, {} partially enrolled",
        classified.len(),
        summary.none,
        summary.full,
        summary.partial
    );
    classified
}
