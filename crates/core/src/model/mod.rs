mod ids;
mod quality;
mod review_item;
mod session;

pub use ids::{ItemId, ItemIdError};

pub use quality::{Confidence, FlashcardRating, Quality, QualityError, response_to_quality};
pub use review_item::{DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR, ReviewItem, create_review_item};
pub use session::{StudyMode, StudySession, StudySessionError};
