//! End-to-end runs over small hand-written input tables

mod utils;

use nh_observe::models::{
    AnchorPolicy, EnrollCategory, PublishedNhEpisode, PublishedObservableEpisode,
};
use nh_observe::pipeline::aggregate::{nh_episodes_output, observable_output};
use nh_observe::utils::io::read_table;
use nh_observe::{RunReport, StudyConfig, aggregate, prepare, run, run_single_worker};

use utils::{AssessmentRow, ClaimRow, EnrollmentRow, date, study_config, write_inputs};

/// Three beneficiaries:
/// - B1 fully enrolled, 2015-03-01..03-20 with a hospital stay 03-10..03-12
/// - B2 enrolled Jan-Aug, open stay from 06-01 with an SNF stay 07-01 + 4 days
/// - B3 never enrolled, 2015-04-01..04-10
fn write_fixture(config: &StudyConfig) {
    let assessments = vec![
        AssessmentRow::entry("B1", date(2015, 3, 1)),
        AssessmentRow::discharge("B1", date(2015, 3, 1), date(2015, 3, 20), "10"),
        AssessmentRow::admission("B1", date(2015, 3, 1), date(2015, 3, 5)),
        AssessmentRow::entry("B2", date(2015, 6, 1)),
        AssessmentRow::admission("B2", date(2015, 6, 1), date(2015, 6, 3)),
        AssessmentRow::entry("B3", date(2015, 4, 1)),
        AssessmentRow::discharge("B3", date(2015, 4, 1), date(2015, 4, 10), "10"),
        AssessmentRow::admission("B3", date(2015, 4, 1), date(2015, 4, 2)),
    ];
    let mut partial = [false; 12];
    partial[..8].fill(true);
    let enrollment = vec![
        EnrollmentRow {
            bene_id: "B1".to_string(),
            year: 2015,
            death_date: None,
            covered: [true; 12],
        },
        EnrollmentRow {
            bene_id: "B2".to_string(),
            year: 2015,
            death_date: None,
            covered: partial,
        },
    ];
    let hospital = vec![ClaimRow {
        bene_id: "B1".to_string(),
        admission_date: date(2015, 3, 10),
        discharge_date: Some(date(2015, 3, 12)),
        length_of_stay: None,
    }];
    let snf = vec![ClaimRow {
        bene_id: "B2".to_string(),
        admission_date: date(2015, 7, 1),
        discharge_date: None,
        length_of_stay: Some(4),
    }];
    write_inputs(config, &assessments, &enrollment, &hospital, &snf);
}

fn observable(config: &StudyConfig, policy: AnchorPolicy) -> Vec<PublishedObservableEpisode> {
    read_table(&observable_output(&config.output_dir, policy)).unwrap()
}

fn spans(rows: &[PublishedObservableEpisode]) -> Vec<(&str, chrono::NaiveDate, chrono::NaiveDate)> {
    rows.iter()
        .map(|r| (r.bene_id.as_str(), r.observable_start, r.observable_end))
        .collect()
}

#[tokio::test]
async fn test_full_run_publishes_both_policies() {
    let dir = tempfile::tempdir().unwrap();
    let config = study_config(dir.path(), 2, "e2e");
    write_fixture(&config);

    let report = run(&config).await.unwrap();
    assert!(report.is_complete(), "{report}");
    assert_eq!(report.policies.len(), 2);

    let expected = vec![
        ("B1", date(2015, 3, 1), date(2015, 3, 9)),
        ("B1", date(2015, 3, 13), date(2015, 3, 20)),
        ("B2", date(2015, 6, 1), date(2015, 6, 30)),
        ("B2", date(2015, 7, 6), date(2015, 8, 31)),
    ];
    for policy in AnchorPolicy::ALL {
        let rows = observable(&config, policy);
        assert_eq!(spans(&rows), expected, "{policy}");
    }

    let rows = observable(&config, AnchorPolicy::Entry);
    assert_eq!(rows[0].enroll_category, EnrollCategory::FullEnrollment);
    assert_eq!(rows[2].enroll_category, EnrollCategory::PartialEnrollment);
    assert_eq!(rows[2].enroll_start, Some(date(2015, 1, 1)));
    assert_eq!(rows[2].enroll_end, Some(date(2015, 8, 31)));
    assert!(rows[2].no_discharge);
    assert_eq!(rows[2].nh_discharge_date, date(2015, 12, 31));

    let episodes: Vec<PublishedNhEpisode> =
        read_table(&nh_episodes_output(&config.output_dir, AnchorPolicy::Entry)).unwrap();
    let benes: Vec<&str> = episodes.iter().map(|e| e.bene_id.as_str()).collect();
    assert_eq!(benes, vec!["B1", "B2", "B3"]);
    assert_eq!(episodes[2].enroll_category, Some(EnrollCategory::NoEnrollment));

    let manifest = RunReport::read(&config.work_dir()).unwrap();
    assert_eq!(manifest, report);
    let stats = manifest.stats.unwrap();
    assert_eq!(stats.imputed_stay_discharges, 1);
}

#[tokio::test]
async fn test_missing_partition_is_reported_then_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let config = study_config(dir.path(), 2, "rerun");
    write_fixture(&config);

    prepare(&config).await.unwrap();
    for policy in AnchorPolicy::ALL {
        let status = run_single_worker(&config, policy, 0).unwrap();
        assert!(status.succeeded());
    }

    let report = aggregate(&config).unwrap();
    assert!(!report.is_complete());
    for policy in &report.policies {
        assert_eq!(policy.missing, vec![1]);
    }
    let partial = observable(&config, AnchorPolicy::Entry);
    assert!(partial.iter().all(|r| r.bene_id == "B1"));
    assert_eq!(partial.len(), 2);

    for policy in AnchorPolicy::ALL {
        assert!(run_single_worker(&config, policy, 1).unwrap().succeeded());
    }
    let report = aggregate(&config).unwrap();
    assert!(report.is_complete(), "{report}");
    assert_eq!(observable(&config, AnchorPolicy::Entry).len(), 4);
}

#[tokio::test]
async fn test_out_of_range_worker_fails_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config = study_config(dir.path(), 2, "bad");
    write_fixture(&config);
    prepare(&config).await.unwrap();

    let status = run_single_worker(&config, AnchorPolicy::Entry, 5).unwrap();
    assert!(!status.succeeded());
    assert!(status.message.unwrap().contains("out of range"));
    assert!(!config.worker(AnchorPolicy::Entry, 5).artifact_path().exists());
    assert!(config.worker(AnchorPolicy::Entry, 5).status_path().exists());
}

#[test]
fn test_worker_without_staging_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = study_config(dir.path(), 2, "unstaged");
    assert!(run_single_worker(&config, AnchorPolicy::Entry, 0).is_err());
}

#[tokio::test]
async fn test_aggregate_counts_staged_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let config = study_config(dir.path(), 2, "shrunk");
    write_fixture(&config);

    prepare(&config).await.unwrap();
    for policy in AnchorPolicy::ALL {
        for index in 0..2 {
            assert!(run_single_worker(&config, policy, index).unwrap().succeeded());
        }
    }

    let narrower = StudyConfig {
        partitions: 1,
        ..config.clone()
    };
    let report = aggregate(&narrower).unwrap();
    assert_eq!(report.partition_count, 2);
    assert!(report.is_complete(), "{report}");
    let rows = observable(&config, AnchorPolicy::Entry);
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().any(|r| r.bene_id == "B2"));
}

#[tokio::test]
async fn test_restaging_clears_earlier_worker_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = study_config(dir.path(), 2, "restaged");
    write_fixture(&config);
    let report = run(&config).await.unwrap();
    assert!(report.is_complete(), "{report}");

    let single = StudyConfig {
        partitions: 1,
        ..config.clone()
    };
    prepare(&single).await.unwrap();
    for policy in AnchorPolicy::ALL {
        assert!(!config.worker(policy, 0).artifact_path().exists());
        assert!(!config.worker(policy, 1).status_path().exists());
    }
    assert!(RunReport::read(&config.work_dir()).is_err());

    let report = aggregate(&config).unwrap();
    assert_eq!(report.partition_count, 1);
    for policy in &report.policies {
        assert_eq!(policy.missing, vec![0]);
    }

    for policy in AnchorPolicy::ALL {
        assert!(run_single_worker(&config, policy, 0).unwrap().succeeded());
    }
    let report = aggregate(&config).unwrap();
    assert!(report.is_complete(), "{report}");
    assert_eq!(observable(&config, AnchorPolicy::Entry).len(), 4);
}
