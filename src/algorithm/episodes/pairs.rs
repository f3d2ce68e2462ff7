//! Entry/discharge pairing
//!
//! Splits cleaned assessment records into entries, discharges and admission
//! assessments, then matches each entry to a single discharge and a single
//! admission assessment. Every join picks one deterministic best match, so
//! duplicate source records never multiply rows.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::algorithm::stats::BuildStats;
use crate::config::StudyWindow;
use crate::models::{AssessmentRecord, DischargeType, EdPair, RecordType, ReturnAnticipated};

/// An entry record with its required fields present
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryRecord {
    pub bene_id: String,
    pub entry_date: NaiveDate,
    pub facility_id: String,
}

/// A discharge record with its required fields present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DischargeRecord {
    pub bene_id: String,
    pub facility_id: Option<String>,
    pub entry_date: NaiveDate,
    pub discharge_date: NaiveDate,
    pub discharge_type: DischargeType,
}

impl DischargeRecord {
    fn return_anticipated(&self) -> ReturnAnticipated {
        self.discharge_type.return_anticipated()
    }

    /// Preference order among competing discharges: earliest date first,
    /// then not-anticipated before anticipated
    fn priority(&self) -> (NaiveDate, ReturnAnticipated, Option<&str>) {
        (
            self.discharge_date,
            self.return_anticipated(),
            self.facility_id.as_deref(),
        )
    }
}

/// An admission assessment with its required fields present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionRecord {
    pub bene_id: String,
    pub facility_id: String,
    pub entry_date: NaiveDate,
    pub assessment_date: NaiveDate,
}

/// Assessment records split by role
#[derive(Debug, Clone, Default)]
pub struct SplitRecords {
    pub entries: Vec<EntryRecord>,
    pub discharges: Vec<DischargeRecord>,
    pub admissions: Vec<AdmissionRecord>,
}

/// Deduplicate, filter and split raw assessment records
///
/// Records missing a required identifier or date are dropped and counted;
/// so are discharges dated before their entry. Discharge dates past the
/// study end are capped at the study end.
pub fn split_records(
    mut records: Vec<AssessmentRecord>,
    window: &StudyWindow,
    accepted_reporting_codes: Option<&[String]>,
    stats: &mut BuildStats,
) -> SplitRecords {
    let before = records.len();
    records.sort_unstable();
    records.dedup();
    stats.duplicate_records += before - records.len();

    let mut split = SplitRecords::default();

    for record in records {
        if let Some(accepted) = accepted_reporting_codes {
            let ok = record
                .reporting_code
                .as_deref()
                .is_some_and(|code| accepted.iter().any(|a| a == code.trim()));
            if !ok {
                stats.reporting_code_excluded += 1;
                continue;
            }
        }

        let Some(entry_date) = record.entry_date else {
            stats.missing_fields += 1;
            continue;
        };
        if entry_date > window.end {
            stats.out_of_window += 1;
            continue;
        }

        match record.record_type {
            RecordType::Entry => {
                let Some(facility_id) = record.facility_id else {
                    stats.missing_fields += 1;
                    continue;
                };
                split.entries.push(EntryRecord {
                    bene_id: record.bene_id,
                    entry_date,
                    facility_id,
                });
            }
            RecordType::DischargeNoReturn
            | RecordType::DischargeReturnAnticipated
            | RecordType::DeathInFacility => {
                let (Some(discharge_date), Some(discharge_type)) =
                    (record.discharge_date, record.record_type.discharge_type())
                else {
                    stats.missing_fields += 1;
                    continue;
                };
                if discharge_date < entry_date {
                    stats.discharge_before_entry += 1;
                    continue;
                }
                if discharge_date < window.lookback {
                    stats.out_of_window += 1;
                    continue;
                }
                split.discharges.push(DischargeRecord {
                    bene_id: record.bene_id,
                    facility_id: record.facility_id,
                    entry_date,
                    discharge_date: discharge_date.min(window.end),
                    discharge_type,
                });
            }
            RecordType::Admission => {
                let (Some(facility_id), Some(assessment_date)) =
                    (record.facility_id, record.assessment_date)
                else {
                    stats.missing_fields += 1;
                    continue;
                };
                split.admissions.push(AdmissionRecord {
                    bene_id: record.bene_id,
                    facility_id,
                    entry_date,
                    assessment_date,
                });
            }
            RecordType::Other => stats.other_records += 1,
        }
    }

    split
}

/// Keep one discharge per (beneficiary, entry date, facility)
///
/// Among several discharges for one entry the earliest wins; on equal dates a
/// return-not-anticipated discharge wins.
pub fn dedupe_discharges(mut discharges: Vec<DischargeRecord>) -> Vec<DischargeRecord> {
    discharges.sort_by(|a, b| {
        (&a.bene_id, a.entry_date, &a.facility_id)
            .cmp(&(&b.bene_id, b.entry_date, &b.facility_id))
            .then_with(|| a.priority().cmp(&b.priority()))
    });
    discharges.dedup_by(|later, kept| {
        later.bene_id == kept.bene_id
            && later.entry_date == kept.entry_date
            && later.facility_id == kept.facility_id
    });
    discharges
}

/// Match entries to discharges and admission assessments
///
/// Entries are joined to discharges on (beneficiary, entry date). An entry
/// without a discharge is imputed to end on the study end date and flagged
/// `no_discharge`. Admission assessments join on (beneficiary, entry date,
/// facility) and qualify only when dated within the stay; the earliest
/// qualifying one is kept.
pub fn match_pairs(split: SplitRecords, window: &StudyWindow, stats: &mut BuildStats) -> Vec<EdPair> {
    let SplitRecords {
        mut entries,
        discharges,
        admissions,
    } = split;

    entries.sort_unstable();
    entries.dedup();

    let discharges = dedupe_discharges(discharges);
    let mut best_discharge: FxHashMap<(&str, NaiveDate), &DischargeRecord> = FxHashMap::default();
    for discharge in &discharges {
        best_discharge
            .entry((discharge.bene_id.as_str(), discharge.entry_date))
            .and_modify(|current| {
                if discharge.priority() < current.priority() {
                    *current = discharge;
                }
            })
            .or_insert(discharge);
    }

    let mut admissions_by_stay: FxHashMap<(&str, NaiveDate, &str), Vec<NaiveDate>> =
        FxHashMap::default();
    for admission in &admissions {
        admissions_by_stay
            .entry((
                admission.bene_id.as_str(),
                admission.entry_date,
                admission.facility_id.as_str(),
            ))
            .or_default()
            .push(admission.assessment_date);
    }

    let mut pairs = Vec::with_capacity(entries.len());
    for entry in &entries {
        let matched = best_discharge.get(&(entry.bene_id.as_str(), entry.entry_date));
        let (discharge_date, discharge_type, return_anticipated, no_discharge) = match matched {
            Some(discharge) => (
                discharge.discharge_date,
                Some(discharge.discharge_type),
                discharge.return_anticipated(),
                false,
            ),
            None => {
                stats.imputed_discharges += 1;
                (window.end, None, ReturnAnticipated::NoDischarge, true)
            }
        };

        let admission_date = admissions_by_stay
            .get(&(
                entry.bene_id.as_str(),
                entry.entry_date,
                entry.facility_id.as_str(),
            ))
            .and_then(|dates| {
                let qualifying = dates
                    .iter()
                    .copied()
                    .filter(|&d| entry.entry_date <= d && d <= discharge_date)
                    .min();
                if qualifying.is_none() {
                    stats.unqualified_admissions += dates.len();
                }
                qualifying
            });

        pairs.push(EdPair {
            bene_id: entry.bene_id.clone(),
            facility_id: entry.facility_id.clone(),
            entry_date: entry.entry_date,
            discharge_date,
            discharge_type,
            return_anticipated,
            no_discharge,
            admission_date,
        });
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window() -> StudyWindow {
        StudyWindow::new(d(2015, 1, 1), d(2016, 12, 31), d(2014, 1, 1))
    }

    fn entry(bene: &str, fac: &str, date: NaiveDate) -> AssessmentRecord {
        AssessmentRecord::new(bene, RecordType::Entry)
            .with_facility(fac)
            .with_entry(date)
    }

    fn discharge(bene: &str, kind: RecordType, entry: NaiveDate, out: NaiveDate) -> AssessmentRecord {
        AssessmentRecord::new(bene, kind)
            .with_facility("F1")
            .with_entry(entry)
            .with_discharge(out)
    }

    #[test]
    fn test_split_drops_bad_records() {
        let records = vec![
            entry("B1", "F1", d(2015, 1, 1)),
            entry("B1", "F1", d(2015, 1, 1)),
            AssessmentRecord::new("B1", RecordType::Entry).with_entry(d(2015, 2, 1)),
            discharge("B1", RecordType::DischargeNoReturn, d(2015, 3, 1), d(2015, 2, 1)),
            entry("B2", "F1", d(2017, 1, 1)),
            AssessmentRecord::new("B3", RecordType::Other).with_entry(d(2015, 1, 1)),
        ];
        let mut stats = BuildStats::default();
        let split = split_records(records, &window(), None, &mut stats);

        assert_eq!(split.entries.len(), 1);
        assert!(split.discharges.is_empty());
        assert_eq!(stats.duplicate_records, 1);
        assert_eq!(stats.missing_fields, 1);
        assert_eq!(stats.discharge_before_entry, 1);
        assert_eq!(stats.out_of_window, 1);
        assert_eq!(stats.other_records, 1);
    }

    #[test]
    fn test_reporting_code_filter() {
        let records = vec![
            entry("B1", "F1", d(2015, 1, 1)).with_reporting_code("3"),
            entry("B2", "F1", d(2015, 1, 1)).with_reporting_code("1"),
            entry("B3", "F1", d(2015, 1, 1)),
        ];
        let accepted = vec!["3".to_string()];
        let mut stats = BuildStats::default();
        let split = split_records(records, &window(), Some(&accepted), &mut stats);
        assert_eq!(split.entries.len(), 1);
        assert_eq!(split.entries[0].bene_id, "B1");
        assert_eq!(stats.reporting_code_excluded, 2);
    }

    #[test]
    fn test_earliest_discharge_wins_and_ties_prefer_no_return() {
        let e = d(2015, 1, 1);
        let records = vec![
            entry("B1", "F1", e),
            discharge("B1", RecordType::DischargeReturnAnticipated, e, d(2015, 2, 1)),
            discharge("B1", RecordType::DischargeNoReturn, e, d(2015, 2, 1)),
            discharge("B1", RecordType::DischargeNoReturn, e, d(2015, 3, 1)),
        ];
        let mut stats = BuildStats::default();
        let split = split_records(records, &window(), None, &mut stats);
        let pairs = match_pairs(split, &window(), &mut stats);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].discharge_date, d(2015, 2, 1));
        assert_eq!(pairs[0].return_anticipated, ReturnAnticipated::NotAnticipated);
        assert!(!pairs[0].no_discharge);
    }

    #[test]
    fn test_missing_discharge_is_imputed() {
        let records = vec![entry("B1", "F1", d(2016, 6, 1))];
        let mut stats = BuildStats::default();
        let split = split_records(records, &window(), None, &mut stats);
        let pairs = match_pairs(split, &window(), &mut stats);

        assert_eq!(pairs[0].discharge_date, d(2016, 12, 31));
        assert!(pairs[0].no_discharge);
        assert_eq!(pairs[0].return_anticipated, ReturnAnticipated::NoDischarge);
        assert_eq!(pairs[0].discharge_type, None);
        assert_eq!(stats.imputed_discharges, 1);
    }

    #[test]
    fn test_earliest_qualifying_admission_attached() {
        let e = d(2015, 1, 1);
        let admission = |date| {
            AssessmentRecord::new("B1", RecordType::Admission)
                .with_facility("F1")
                .with_entry(e)
                .with_assessment(date)
        };
        let records = vec![
            entry("B1", "F1", e),
            discharge("B1", RecordType::DischargeNoReturn, e, d(2015, 3, 1)),
            admission(d(2015, 1, 9)),
            admission(d(2015, 1, 5)),
            // after discharge, does not qualify
            admission(d(2015, 4, 1)),
        ];
        let mut stats = BuildStats::default();
        let split = split_records(records, &window(), None, &mut stats);
        let pairs = match_pairs(split, &window(), &mut stats);
        assert_eq!(pairs[0].admission_date, Some(d(2015, 1, 5)));
    }

    #[test]
    fn test_discharge_capped_at_study_end() {
        let e = d(2016, 12, 1);
        let records = vec![
            entry("B1", "F1", e),
            discharge("B1", RecordType::DischargeNoReturn, e, d(2017, 2, 1)),
        ];
        let mut stats = BuildStats::default();
        let split = split_records(records, &window(), None, &mut stats);
        let pairs = match_pairs(split, &window(), &mut stats);
        assert_eq!(pairs[0].discharge_date, d(2016, 12, 31));
        assert!(!pairs[0].no_discharge);
    }
}
