use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::Quality;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("correct answers ({correct}) exceed items studied ({studied})")]
    CountMismatch { studied: u32, correct: u32 },

    #[error("average quality must be a finite value in [0, 5], got {0}")]
    InvalidAverageQuality(f64),

    #[error("too many answers for a single session: {len}")]
    TooManyAnswers { len: usize },
}

/// Drill type that produced a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StudyMode {
    Flashcards,
    Quiz,
    /// Any other drill, kept verbatim.
    Other(String),
}

impl StudyMode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            StudyMode::Flashcards => "flashcards",
            StudyMode::Quiz => "quiz",
            StudyMode::Other(name) => name,
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "flashcards" | "flashcard" => StudyMode::Flashcards,
            "quiz" => StudyMode::Quiz,
            _ => StudyMode::Other(s.trim().to_owned()),
        })
    }
}

impl From<String> for StudyMode {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}

impl From<StudyMode> for String {
    fn from(mode: StudyMode) -> Self {
        mode.as_str().to_owned()
    }
}

impl Serialize for StudyMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StudyMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StudyMode::from(raw))
    }
}

/// One entry of the study history log.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySession {
    date: DateTime<Utc>,
    items_studied: u32,
    correct_answers: u32,
    average_quality: f64,
    mode: StudyMode,
}

impl StudySession {
    /// Build a validated log entry.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::CountMismatch` if more answers are correct than studied.
    /// Returns `StudySessionError::InvalidAverageQuality` for non-finite or out-of-range averages.
    pub fn new(
        date: DateTime<Utc>,
        items_studied: u32,
        correct_answers: u32,
        average_quality: f64,
        mode: StudyMode,
    ) -> Result<Self, StudySessionError> {
        if correct_answers > items_studied {
            return Err(StudySessionError::CountMismatch {
                studied: items_studied,
                correct: correct_answers,
            });
        }
        if !average_quality.is_finite() || !(0.0..=5.0).contains(&average_quality) {
            return Err(StudySessionError::InvalidAverageQuality(average_quality));
        }

        Ok(Self {
            date,
            items_studied,
            correct_answers,
            average_quality,
            mode,
        })
    }

    /// Build a log entry from the qualities recorded during a drill.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::TooManyAnswers` if the count cannot fit in `u32`.
    pub fn from_qualities(
        date: DateTime<Utc>,
        mode: StudyMode,
        qualities: &[Quality],
    ) -> Result<Self, StudySessionError> {
        let items_studied = u32::try_from(qualities.len())
            .map_err(|_| StudySessionError::TooManyAnswers { len: qualities.len() })?;

        let mut correct = 0_u32;
        let mut sum = 0_u64;
        for q in qualities {
            if q.is_correct() {
                correct = correct.saturating_add(1);
            }
            sum += u64::from(q.value());
        }

        let average_quality = if items_studied == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let avg = sum as f64 / f64::from(items_studied);
            avg
        };

        Self::new(date, items_studied, correct, average_quality, mode)
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    #[must_use]
    pub fn items_studied(&self) -> u32 {
        self.items_studied
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn average_quality(&self) -> f64 {
        self.average_quality
    }

    #[must_use]
    pub fn mode(&self) -> &StudyMode {
        &self.mode
    }
}
