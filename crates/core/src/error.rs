use thiserror::Error;

use crate::model::{ItemIdError, QualityError, StudySessionError};
use crate::scheduler::SchedulerError;

/// Umbrella error for domain validation failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    ItemId(#[from] ItemIdError),
    #[error(transparent)]
    Quality(#[from] QualityError),
    #[error(transparent)]
    StudySession(#[from] StudySessionError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
