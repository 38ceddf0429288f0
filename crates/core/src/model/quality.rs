use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur while parsing learner responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QualityError {
    #[error("unknown flashcard rating: {0}")]
    UnknownRating(String),
}

//
// ─── QUALITY ──────────────────────────────────────────────────────────────────
//

/// Recall quality for a single review event, always within `0..=5`.
///
/// - `0`: complete blackout
/// - `1`–`2`: incorrect (a lapse)
/// - `3`: correct with serious difficulty
/// - `4`: correct after hesitation
/// - `5`: effortless recall
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(0);
    pub const MAX: Quality = Quality(5);

    /// Lowest quality that still counts as a successful recall.
    pub const PASSING: Quality = Quality(3);

    /// Builds a quality score, clamping out-of-range input into `0..=5`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        // Clamp keeps the cast lossless.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = value.clamp(0, 5) as u8;
        Self(v)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// A lapse is any review graded below `PASSING`.
    #[must_use]
    pub fn is_lapse(self) -> bool {
        self < Self::PASSING
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        !self.is_lapse()
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::clamped(i64::from(value))
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── CONFIDENCE ───────────────────────────────────────────────────────────────
//

/// Self-reported confidence attached to a quiz answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Low,
}

impl Confidence {
    /// Parses a confidence label. Anything other than `high` is `Low`.
    #[must_use]
    pub fn parse_lossy(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("high") {
            Self::High
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Low => "low",
        }
    }
}

//
// ─── CLASSIFIER ───────────────────────────────────────────────────────────────
//

/// Maps a quiz response onto a quality score.
///
/// A confidently wrong answer scores lower than a hesitant miss: it points at
/// a wrong mental model rather than a fading memory.
#[must_use]
pub fn response_to_quality(is_correct: bool, confidence: Confidence) -> Quality {
    match (is_correct, confidence) {
        (true, Confidence::High) => Quality(5),
        (true, Confidence::Low) => Quality(4),
        (false, Confidence::High) => Quality(0),
        (false, Confidence::Low) => Quality(2),
    }
}

//
// ─── FLASHCARD RATING ─────────────────────────────────────────────────────────
//

/// Answer buttons offered by flashcard drills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashcardRating {
    Wrong,
    Hard,
    Good,
    Easy,
}

impl FlashcardRating {
    pub const ALL: [FlashcardRating; 4] = [
        FlashcardRating::Wrong,
        FlashcardRating::Hard,
        FlashcardRating::Good,
        FlashcardRating::Easy,
    ];

    #[must_use]
    pub fn quality(self) -> Quality {
        match self {
            FlashcardRating::Wrong => Quality(0),
            FlashcardRating::Hard => Quality(3),
            FlashcardRating::Good => Quality(4),
            FlashcardRating::Easy => Quality(5),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FlashcardRating::Wrong => "wrong",
            FlashcardRating::Hard => "hard",
            FlashcardRating::Good => "good",
            FlashcardRating::Easy => "easy",
        }
    }
}

impl FromStr for FlashcardRating {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrong" | "again" | "w" => Ok(Self::Wrong),
            "hard" | "h" => Ok(Self::Hard),
            "good" | "g" => Ok(Self::Good),
            "easy" | "e" => Ok(Self::Easy),
            _ => Err(QualityError::UnknownRating(s.to_owned())),
        }
    }
}

impl From<FlashcardRating> for Quality {
    fn from(rating: FlashcardRating) -> Self {
        rating.quality()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
