//! Fixture writers for the raw input tables
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use nh_observe::config::{EnrollmentCodes, InputPaths, StudyConfig};
use nh_observe::sources::enrollment::{
    BUYIN_PREFIX, HMO_PREFIX, PART_D_PREFIX, create_enrollment_schema,
};
use nh_observe::utils::io::write_parquet;

#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn date32(d: Option<NaiveDate>) -> Option<i32> {
    d.map(|d| i32::try_from((d - date(1970, 1, 1)).num_days()).unwrap())
}

/// One row of the assessment table
#[derive(Debug, Clone)]
pub struct AssessmentRow {
    pub bene_id: String,
    pub facility_id: String,
    pub record_type: &'static str,
    pub entry_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
    pub assessment_date: Option<NaiveDate>,
}

impl AssessmentRow {
    pub fn entry(bene: &str, entry: NaiveDate) -> Self {
        Self {
            bene_id: bene.to_string(),
            facility_id: "F1".to_string(),
            record_type: "01",
            entry_date: entry,
            discharge_date: None,
            assessment_date: None,
        }
    }

    pub fn discharge(bene: &str, entry: NaiveDate, discharge: NaiveDate, code: &'static str) -> Self {
        Self {
            record_type: code,
            discharge_date: Some(discharge),
            ..Self::entry(bene, entry)
        }
    }

    pub fn admission(bene: &str, entry: NaiveDate, assessed: NaiveDate) -> Self {
        Self {
            record_type: "AD",
            assessment_date: Some(assessed),
            ..Self::entry(bene, entry)
        }
    }
}

/// One row of a hospital or SNF claim table
#[derive(Debug, Clone)]
pub struct ClaimRow {
    pub bene_id: String,
    pub admission_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
    pub length_of_stay: Option<i32>,
}

/// One beneficiary-year of the enrollment summary
#[derive(Debug, Clone)]
pub struct EnrollmentRow {
    pub bene_id: String,
    pub year: i32,
    pub death_date: Option<NaiveDate>,
    /// Months with FFS, Part A/B and Part D coverage
    pub covered: [bool; 12],
}

pub fn write_assessments(path: &Path, rows: &[AssessmentRow]) {
    let schema = Schema::new(vec![
        Field::new("bene_id", DataType::Utf8, true),
        Field::new("facility_id", DataType::Utf8, true),
        Field::new("record_type", DataType::Utf8, true),
        Field::new("entry_date", DataType::Date32, true),
        Field::new("discharge_date", DataType::Date32, true),
        Field::new("assessment_date", DataType::Date32, true),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.bene_id.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.facility_id.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.record_type))),
        Arc::new(Date32Array::from(
            rows.iter().map(|r| date32(Some(r.entry_date))).collect::<Vec<_>>(),
        )),
        Arc::new(Date32Array::from(
            rows.iter().map(|r| date32(r.discharge_date)).collect::<Vec<_>>(),
        )),
        Arc::new(Date32Array::from(
            rows.iter().map(|r| date32(r.assessment_date)).collect::<Vec<_>>(),
        )),
    ];
    write_batch(path, schema, columns);
}

pub fn write_claims(path: &Path, rows: &[ClaimRow]) {
    let schema = Schema::new(vec![
        Field::new("bene_id", DataType::Utf8, true),
        Field::new("claim_id", DataType::Utf8, true),
        Field::new("admission_date", DataType::Date32, true),
        Field::new("discharge_date", DataType::Date32, true),
        Field::new("length_of_stay", DataType::Int32, true),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.bene_id.as_str()))),
        Arc::new(StringArray::from_iter_values(
            (0..rows.len()).map(|i| format!("C{i}")),
        )),
        Arc::new(Date32Array::from(
            rows.iter().map(|r| date32(Some(r.admission_date))).collect::<Vec<_>>(),
        )),
        Arc::new(Date32Array::from(
            rows.iter().map(|r| date32(r.discharge_date)).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            rows.iter().map(|r| r.length_of_stay).collect::<Vec<_>>(),
        )),
    ];
    write_batch(path, schema, columns);
}

pub fn write_enrollment(path: &Path, rows: &[EnrollmentRow]) {
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.bene_id.as_str()))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
        Arc::new(Date32Array::from(vec![None::<i32>; rows.len()])),
        Arc::new(Date32Array::from(
            rows.iter().map(|r| date32(r.death_date)).collect::<Vec<_>>(),
        )),
    ];
    for (prefix, covered, uncovered) in [
        (HMO_PREFIX, "0", "1"),
        (BUYIN_PREFIX, "3", "0"),
        (PART_D_PREFIX, "H1234", "N"),
    ] {
        for month in 1..=12usize {
            let values = rows
                .iter()
                .map(|r| if r.covered[month - 1] { covered } else { uncovered });
            columns.push(Arc::new(StringArray::from_iter_values(values)));
        }
    }
    write_batch(path, create_enrollment_schema(), columns);
}

fn write_batch(path: &Path, schema: Schema, columns: Vec<ArrayRef>) {
    let batch = RecordBatch::try_new(Arc::new(schema.clone()), columns).unwrap();
    write_parquet(path, &schema, &[batch]).unwrap();
}

/// Study configuration for calendar year 2015 with inputs under `dir/in`
#[must_use]
pub fn study_config(dir: &Path, partitions: usize, run_id: &str) -> StudyConfig {
    let input = dir.join("in");
    StudyConfig {
        study_start: date(2015, 1, 1),
        study_end: date(2015, 12, 31),
        lookback_date: date(2014, 1, 1),
        inputs: InputPaths {
            assessments: input.join("assessments.parquet"),
            enrollment: input.join("enrollment.parquet"),
            hospital: input.join("hospital.parquet"),
            snf: input.join("snf.parquet"),
        },
        output_dir: dir.join("out"),
        partitions,
        run_id: run_id.to_string(),
        return_gap_days: 30,
        accepted_reporting_codes: None,
        enrollment_codes: EnrollmentCodes::default(),
    }
}

/// Write the input tables for `config`
pub fn write_inputs(
    config: &StudyConfig,
    assessments: &[AssessmentRow],
    enrollment: &[EnrollmentRow],
    hospital: &[ClaimRow],
    snf: &[ClaimRow],
) {
    write_assessments(&config.inputs.assessments, assessments);
    write_enrollment(&config.inputs.enrollment, enrollment);
    write_claims(&config.inputs.hospital, hospital);
    write_claims(&config.inputs.snf, snf);
}
