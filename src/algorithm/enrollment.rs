//! Enrollment episode builder
//!
//! A month counts when the beneficiary is simultaneously fee-for-service,
//! covered by Parts A and B, and enrolled in a Part D plan. Consecutive
//! counting months collapse into one [`EnrollmentEpisode`].

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::algorithm::runs::{Span, collapse_runs, follows};
use crate::config::EnrollmentCodes;
use crate::models::{BeneficiaryEnrollment, EnrollmentEpisode, MonthlyCodes, MonthlyStatus, YearMonth};

impl Span for YearMonth {
    fn start(&self) -> NaiveDate {
        self.first_day()
    }

    fn end(&self) -> NaiveDate {
        self.last_day()
    }
}

/// Evaluate the three monthly indicators
///
/// The month of death is credited on all three indicators even when the
/// file has already dropped its codes. Death only adds credit: any other
/// month counts exactly when its raw codes qualify.
#[must_use]
pub fn month_status(
    codes: &MonthlyCodes,
    month: YearMonth,
    death: Option<NaiveDate>,
    rules: &EnrollmentCodes,
) -> MonthlyStatus {
    let died_this_month = death.is_some_and(|d| month.contains(d));
    MonthlyStatus {
        ffs: died_this_month || rules.is_ffs(codes.ffs.as_deref()),
        part_ab: died_this_month || rules.is_part_ab(codes.part_ab.as_deref()),
        part_d: died_this_month || rules.is_part_d(codes.part_d.as_deref()),
    }
}

/// Months in which the composite enrollment indicator holds, ascending
#[must_use]
pub fn qualifying_months(bene: &BeneficiaryEnrollment, rules: &EnrollmentCodes) -> Vec<YearMonth> {
    bene.months
        .iter()
        .filter(|(month, codes)| month_status(codes, **month, bene.death_date, rules).enrolled())
        .map(|(month, _)| *month)
        .collect()
}

/// Build enrollment episodes for a population
///
/// Beneficiaries are processed in id order and episode ids run sequentially
/// across the whole population, starting at 1.
#[must_use]
pub fn build_enrollment_episodes(
    beneficiaries: &[BeneficiaryEnrollment],
    rules: &EnrollmentCodes,
) -> Vec<EnrollmentEpisode> {
    let mut ordered: Vec<&BeneficiaryEnrollment> = beneficiaries.iter().collect();
    ordered.sort_by(|a, b| a.bene_id.cmp(&b.bene_id));

    let mut episodes = Vec::new();
    let mut next_id = 1u32;
    for bene in ordered {
        let months = qualifying_months(bene, rules);
        for run in collapse_runs(&months, follows) {
            episodes.push(EnrollmentEpisode {
                bene_id: bene.bene_id.clone(),
                episode_id: next_id,
                enroll_start: run.start,
                enroll_end: run.last().last_day(),
            });
            next_id += 1;
        }
    }

    log::info!(
        "Built {} enrollment episodes for {} beneficiaries",
        episodes.len(),
        beneficiaries.len()
    );
    episodes
}

/// Date of death per beneficiary
#[must_use]
pub fn death_dates(beneficiaries: &[BeneficiaryEnrollment]) -> FxHashMap<String, NaiveDate> {
    beneficiaries
        .iter()
        .filter_map(|b| b.death_date.map(|d| (b.bene_id.clone(), d)))
        .collect()
}

/// Group enrollment episodes by beneficiary, each list sorted by start
#[must_use]
pub fn index_by_beneficiary(
    episodes: &[EnrollmentEpisode],
) -> FxHashMap<&str, Vec<&EnrollmentEpisode>> {
    let mut index: FxHashMap<&str, Vec<&EnrollmentEpisode>> = FxHashMap::default();
    for episode in episodes {
        index.entry(episode.bene_id.as_str()).or_default().push(episode);
    }
    for list in index.values_mut() {
        list.sort_by_key(|e| e.enroll_start);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn enrolled() -> MonthlyCodes {
        MonthlyCodes {
            ffs: Some("0".to_string()),
            part_ab: Some("3".to_string()),
            part_d: Some("S5601".to_string()),
        }
    }

    fn bene(id: &str, months: &[(i32, u32, MonthlyCodes)]) -> BeneficiaryEnrollment {
        let mut b = BeneficiaryEnrollment::new(id);
        for (y, m, codes) in months {
            b.months.insert(YearMonth::new(*y, *m).unwrap(), codes.clone());
        }
        b
    }

    #[test]
    fn test_gap_splits_enrollment() {
        let lapsed = MonthlyCodes {
            part_d: Some("N".to_string()),
            ..enrolled()
        };
        let b = bene(
            "B1",
            &[
                (2015, 1, enrolled()),
                (2015, 2, enrolled()),
                (2015, 3, enrolled()),
                (2015, 4, lapsed),
                (2015, 5, enrolled()),
            ],
        );
        let episodes = build_enrollment_episodes(&[b], &EnrollmentCodes::default());

        assert_eq!(episodes.len(), 2);
        assert_eq!((episodes[0].enroll_start, episodes[0].enroll_end), (d(2015, 1, 1), d(2015, 3, 31)));
        assert_eq!((episodes[1].enroll_start, episodes[1].enroll_end), (d(2015, 5, 1), d(2015, 5, 31)));
        assert_eq!(episodes[1].episode_id, 2);
    }

    #[test]
    fn test_run_crosses_year_boundary() {
        let b = bene("B1", &[(2015, 12, enrolled()), (2016, 1, enrolled())]);
        let episodes = build_enrollment_episodes(&[b], &EnrollmentCodes::default());
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].enroll_end, d(2016, 1, 31));
    }

    #[test]
    fn test_missing_month_breaks_run() {
        // March absent from the file entirely
        let b = bene("B1", &[(2015, 2, enrolled()), (2015, 4, enrolled())]);
        let episodes = build_enrollment_episodes(&[b], &EnrollmentCodes::default());
        assert_eq!(episodes.len(), 2);
    }

    #[test]
    fn test_death_month_credited() {
        let mut b = bene(
            "B1",
            &[
                (2015, 1, enrolled()),
                (2015, 2, MonthlyCodes::default()),
                (2015, 3, enrolled()),
            ],
        );
        b.death_date = Some(d(2015, 2, 14));
        let episodes = build_enrollment_episodes(&[b], &EnrollmentCodes::default());
        assert_eq!(episodes.len(), 1);
        assert_eq!((episodes[0].enroll_start, episodes[0].enroll_end), (d(2015, 1, 1), d(2015, 3, 31)));
    }

    #[test]
    fn test_qualifying_codes_after_death_still_count() {
        let mut b = bene(
            "B1",
            &[
                (2015, 1, enrolled()),
                (2015, 2, enrolled()),
                (2015, 3, enrolled()),
                (2015, 4, enrolled()),
                (2015, 5, MonthlyCodes::default()),
            ],
        );
        b.death_date = Some(d(2015, 2, 10));
        let episodes = build_enrollment_episodes(&[b], &EnrollmentCodes::default());
        assert_eq!(episodes.len(), 1);
        assert_eq!((episodes[0].enroll_start, episodes[0].enroll_end), (d(2015, 1, 1), d(2015, 4, 30)));

        let rules = EnrollmentCodes::default();
        let may = YearMonth::new(2015, 5).unwrap();
        assert!(!month_status(&MonthlyCodes::default(), may, Some(d(2015, 2, 10)), &rules).enrolled());
    }

    #[test]
    fn test_ids_sequential_across_population() {
        let a = bene("B2", &[(2015, 1, enrolled())]);
        let b = bene("B1", &[(2015, 1, enrolled()), (2015, 3, enrolled())]);
        let episodes = build_enrollment_episodes(&[a, b], &EnrollmentCodes::default());
        let ids: Vec<_> = episodes.iter().map(|e| (e.bene_id.as_str(), e.episode_id)).collect();
        assert_eq!(ids, vec![("B1", 1), ("B1", 2), ("B2", 3)]);
    }

    #[test]
    fn test_each_indicator_required() {
        let rules = EnrollmentCodes::default();
        let month = YearMonth::new(2015, 1).unwrap();
        let managed_care = MonthlyCodes {
            ffs: Some("1".to_string()),
            ..enrolled()
        };
        assert!(!month_status(&managed_care, month, None, &rules).enrolled());
        assert!(month_status(&enrolled(), month, None, &rules).enrolled());
    }
}
