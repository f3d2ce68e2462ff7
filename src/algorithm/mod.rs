//! Episode construction and the day-level engine
//!
//! The build stage runs enrollment, episode and stay builders over the whole
//! population and classifies NH episodes against enrollment. The day-level
//! engine in [`days`] runs per partition inside the workers.

pub mod classify;
pub mod days;
pub mod enrollment;
pub mod episodes;
pub mod partition;
pub mod runs;
pub mod stats;
pub mod stays;

pub use classify::{ClassificationSummary, ClassifiedEpisode, classify_episodes};
pub use days::observable_episodes;
pub use enrollment::build_enrollment_episodes;
pub use episodes::{EpisodeSet, build_episodes};
pub use partition::{partition_ranges, partition_slice};
pub use runs::{Span, collapse_runs};
pub use stats::BuildStats;
pub use stays::clean_stays;
