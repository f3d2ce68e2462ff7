//! Date-of-death correction

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::algorithm::stats::BuildStats;
use crate::models::{NhEpisode, ReturnAnticipated};

/// Reconcile episodes with the enrollment file's date of death
///
/// Episodes that start after death are dropped. When death falls strictly
/// between entry and discharge the episode is truncated to end on the day of
/// death, loses its discharge type, is forced to return-not-anticipated and
/// gets `death_error` set. A death on the entry or discharge day leaves the
/// episode as it is. Zero-length episodes are dropped.
pub fn apply_death_correction(
    episodes: Vec<NhEpisode>,
    deaths: &FxHashMap<String, NaiveDate>,
    stats: &mut BuildStats,
) -> Vec<NhEpisode> {
    let mut kept = Vec::with_capacity(episodes.len());

    for mut episode in episodes {
        let death = deaths.get(&episode.bene_id).copied();
        episode.death_date = death;

        if let Some(death) = death {
            if death < episode.entry_date {
                stats.death_before_entry += 1;
                continue;
            }
            if death > episode.entry_date && death < episode.discharge_date {
                episode.discharge_date = death;
                episode.discharge_type = None;
                episode.return_anticipated = ReturnAnticipated::NotAnticipated;
                episode.death_error = true;
                stats.death_truncated += 1;
            }
        }

        kept.push(episode);
    }

    drop_zero_length(kept, stats)
}

/// Remove episodes whose entry and discharge fall on the same day
pub fn drop_zero_length(mut episodes: Vec<NhEpisode>, stats: &mut BuildStats) -> Vec<NhEpisode> {
    let before = episodes.len();
    episodes.retain(|e| e.entry_date < e.discharge_date);
    stats.zero_length += before - episodes.len();
    episodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DischargeType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn episode(entry: NaiveDate, discharge: NaiveDate) -> NhEpisode {
        NhEpisode {
            bene_id: "B1".to_string(),
            episode_id: 1,
            entry_date: entry,
            discharge_date: discharge,
            discharge_type: Some(DischargeType::ReturnAnticipated),
            return_anticipated: ReturnAnticipated::Anticipated,
            no_discharge: false,
            death_error: false,
            death_date: None,
            admission_date: None,
            admission_entry_date: None,
            enroll_category: None,
        }
    }

    fn deaths(date: NaiveDate) -> FxHashMap<String, NaiveDate> {
        let mut map = FxHashMap::default();
        map.insert("B1".to_string(), date);
        map
    }

    #[test]
    fn test_death_truncation() {
        let mut stats = BuildStats::default();
        let out = apply_death_correction(
            vec![episode(d(2015, 1, 1), d(2015, 2, 1))],
            &deaths(d(2015, 1, 15)),
            &mut stats,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].discharge_date, d(2015, 1, 15));
        assert!(out[0].death_error);
        assert_eq!(out[0].discharge_type, None);
        assert_eq!(out[0].return_anticipated, ReturnAnticipated::NotAnticipated);
        assert_eq!(out[0].death_date, Some(d(2015, 1, 15)));
        assert!(out[0].death_match());
        assert_eq!(stats.death_truncated, 1);
    }

    #[test]
    fn test_death_before_entry_drops_episode() {
        let mut stats = BuildStats::default();
        let out = apply_death_correction(
            vec![episode(d(2015, 3, 1), d(2015, 4, 1))],
            &deaths(d(2015, 2, 1)),
            &mut stats,
        );
        assert!(out.is_empty());
        assert_eq!(stats.death_before_entry, 1);
    }

    #[test]
    fn test_death_on_discharge_day_is_untouched() {
        let mut stats = BuildStats::default();
        let out = apply_death_correction(
            vec![episode(d(2015, 1, 1), d(2015, 2, 1))],
            &deaths(d(2015, 2, 1)),
            &mut stats,
        );
        assert_eq!(out[0].discharge_date, d(2015, 2, 1));
        assert!(!out[0].death_error);
        assert_eq!(out[0].discharge_type, Some(DischargeType::ReturnAnticipated));
    }

    #[test]
    fn test_death_on_entry_day_is_untouched() {
        let mut stats = BuildStats::default();
        let out = apply_death_correction(
            vec![episode(d(2015, 1, 1), d(2015, 2, 1))],
            &deaths(d(2015, 1, 1)),
            &mut stats,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].discharge_date, d(2015, 2, 1));
        assert!(!out[0].death_error);
        assert_eq!(out[0].death_date, Some(d(2015, 1, 1)));
        assert_eq!(stats.death_truncated, 0);
        assert_eq!(stats.zero_length, 0);
    }

    #[test]
    fn test_zero_length_excluded() {
        let mut stats = BuildStats::default();
        let out = drop_zero_length(
            vec![
                episode(d(2015, 1, 1), d(2015, 1, 1)),
                episode(d(2015, 1, 1), d(2015, 1, 2)),
            ],
            &mut stats,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(stats.zero_length, 1);
    }
}
