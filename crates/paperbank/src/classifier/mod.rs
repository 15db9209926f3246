pub mod branch;
pub mod engine;

use serde::Serialize;
use thiserror::Error;

pub use engine::Classifier;

/// Structured metadata extracted from one filename. All fields are
/// populated; the branch and subject name may be best-effort values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedDocument {
    pub degree: String,
    pub branch: String,
    /// Semester number, always 1..=8.
    pub semester: u8,
    pub subject_code: String,
    pub subject_name: String,
}

/// Why a filename was excluded. Rejections are expected data, not faults:
/// the batch loop logs them and moves on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("no B.Tech/B.E or Model Curriculum marker, or a disjoint degree family named instead")]
    MissingDegreeMarker,

    #[error("no recognizable Semester-<I..VIII> token")]
    MissingSemester,

    #[error("no subject-code candidate starts with a recognized prefix")]
    MissingSubjectCode,
}
