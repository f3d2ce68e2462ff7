//! In-process worker pool
//!
//! Runs the P workers of one policy on a dedicated rayon pool and waits for
//! all of them. A failed worker never stops the others and is not retried.

use rayon::prelude::*;

use crate::config::StudyConfig;
use crate::error::{NhError, Result};
use crate::models::AnchorPolicy;
use crate::pipeline::staging::StagedTables;
use crate::pipeline::worker::{WorkerStatus, run_worker};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Run every partition of `policy` and collect their statuses in partition order
pub fn run_pool(
    config: &StudyConfig,
    policy: AnchorPolicy,
    staged: &StagedTables,
) -> Result<Vec<WorkerStatus>> {
    let work = staged.day_level_work(policy);
    std::fs::create_dir_all(config.work_dir()).map_err(|e| NhError::io(config.work_dir(), e))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.partitions)
        .thread_name(|i| format!("nh-worker-{i}"))
        .build()
        .map_err(|e| NhError::config(format!("cannot start worker pool: {e}")))?;

    log::info!(
        "Running {} {policy} workers over {} episodes (run {})",
        config.partitions,
        work.len(),
        config.run_id
    );
    let pb = create_main_progress_bar(
        config.partitions as u64,
        Some(&format!("{policy} partitions")),
    );

    let statuses: Vec<WorkerStatus> = pool.install(|| {
        (0..config.partitions)
            .into_par_iter()
            .map(|index| {
                let status = run_worker(&config.worker(policy, index), &work, staged);
                pb.inc(1);
                status
            })
            .collect()
    });

    let failed: Vec<usize> = statuses
        .iter()
        .filter(|s| !s.succeeded())
        .map(|s| s.partition_index)
        .collect();
    if failed.is_empty() {
        finish_progress_bar(&pb, Some("all partitions complete"));
    } else {
        finish_progress_bar(&pb, Some("some partitions failed"));
        log::error!(
            "{} of {} {policy} workers failed in run {}: partitions {failed:?}",
            failed.len(),
            statuses.len(),
            config.run_id
        );
    }
    Ok(statuses)
}
