//! Domain models for assessment, enrollment and claims data and the episodes
//! derived from them.

pub mod assessment;
pub mod core;
pub mod enrollment;
pub mod episode;
pub mod observable;
pub mod stay;

pub use assessment::{AssessmentRecord, DischargeType, RecordType, ReturnAnticipated};
pub use core::ArrowSchema;
pub use enrollment::{
    BeneficiaryEnrollment, EnrollmentEpisode, MonthlyCodes, MonthlyStatus, YearMonth,
};
pub use episode::{AnchorPolicy, EdPair, EnrollCategory, NhEpisode, PublishedNhEpisode};
pub use observable::{DayRecord, DrugObservableEpisode, PublishedObservableEpisode};
pub use stay::{RawClaim, Stay, StayKind};
