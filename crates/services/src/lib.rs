#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod review_service;
pub mod sessions;
pub mod statistics_service;
pub mod vocabulary_service;

pub use vocab_core::Clock;

pub use app_services::{AppServices, ServiceSettings};
pub use error::{
    AppServicesError, ReviewServiceError, SessionError, StatisticsServiceError,
    VocabularyServiceError,
};
pub use review_service::{ReviewService, ReviewedItem};
pub use sessions::{
    DrillSession, SessionAnswerResult, SessionConfig, SessionLoopService, SessionPlan,
    SessionProgress,
};
pub use statistics_service::StatisticsService;
pub use vocabulary_service::VocabularyService;
