//! Exclusion and imputation ledger
//!
//! Data-quality exclusions never fail a run. They are counted here and logged
//! once per stage so that every dropped record is accounted for.

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Counters collected while building episodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Exact duplicate assessment records
    pub duplicate_records: usize,
    /// Records outside the accepted reporting codes
    pub reporting_code_excluded: usize,
    /// Records outside the study window
    pub out_of_window: usize,
    /// Records lacking a required identifier or date
    pub missing_fields: usize,
    /// Discharge records with discharge before entry
    pub discharge_before_entry: usize,
    /// Records of a type that plays no part in pairing
    pub other_records: usize,
    /// Entries with no matching discharge record
    pub imputed_discharges: usize,
    /// Admission assessments that fell outside their stay
    pub unqualified_admissions: usize,
    /// Beneficiaries dropped for overlapping episodes after collapse
    pub overlap_beneficiaries: usize,
    /// Episodes dropped because death preceded entry
    pub death_before_entry: usize,
    /// Episodes truncated at the date of death
    pub death_truncated: usize,
    /// Zero-length episodes dropped
    pub zero_length: usize,
    /// Entry-anchored episodes preceding the first admission of their group
    pub before_admission: usize,
    /// Claim stays with an imputed discharge date
    pub imputed_stay_discharges: usize,
    /// Claim stays rejected as malformed or out of window
    pub rejected_stays: usize,
}

impl BuildStats {
    /// Total number of records or episodes excluded
    #[must_use]
    pub const fn excluded(&self) -> usize {
        self.duplicate_records
            + self.reporting_code_excluded
            + self.out_of_window
            + self.missing_fields
            + self.discharge_before_entry
            + self.death_before_entry
            + self.zero_length
            + self.before_admission
            + self.rejected_stays
    }

    /// Log the counters for a finished stage
    pub fn log(&self, stage: &str) {
        log::info!("{stage}: {self}");
    }
}

impl AddAssign for BuildStats {
    fn add_assign(&mut self, rhs: Self) {
        self.duplicate_records += rhs.duplicate_records;
        self.reporting_code_excluded += rhs.reporting_code_excluded;
        self.out_of_window += rhs.out_of_window;
        self.missing_fields += rhs.missing_fields;
        self.discharge_before_entry += rhs.discharge_before_entry;
        self.other_records += rhs.other_records;
        self.imputed_discharges += rhs.imputed_discharges;
        self.unqualified_admissions += rhs.unqualified_admissions;
        self.overlap_beneficiaries += rhs.overlap_beneficiaries;
        self.death_before_entry += rhs.death_before_entry;
        self.death_truncated += rhs.death_truncated;
        self.zero_length += rhs.zero_length;
        self.before_admission += rhs.before_admission;
        self.imputed_stay_discharges += rhs.imputed_stay_discharges;
        self.rejected_stays += rhs.rejected_stays;
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duplicates={} reporting={} window={} missing={} discharge<entry={} other={} \
             imputed_discharge={} unqualified_admission={} overlap_benes={} \
             death<entry={} death_truncated={} zero_length={} before_admission={} \
             imputed_stay={} rejected_stays={}",
            self.duplicate_records,
            self.reporting_code_excluded,
            self.out_of_window,
            self.missing_fields,
            self.discharge_before_entry,
            self.other_records,
            self.imputed_discharges,
            self.unqualified_admissions,
            self.overlap_beneficiaries,
            self.death_before_entry,
            self.death_truncated,
            self.zero_length,
            self.before_admission,
            self.imputed_stay_discharges,
            self.rejected_stays,
        )
    }
}
