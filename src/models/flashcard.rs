//! Flashcard is a pair <front, back> owned by a single user, plus its review state.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Starting ease factor for cards created without an explicit one.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub Uuid);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(CardId)
            .map_err(|e| Error::InvalidArgument(format!("invalid card id '{s}': {e}")))
    }
}

/// Informational label chosen by the user; the scheduler ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::InvalidArgument(format!(
                "unknown difficulty '{other}', expected easy, medium or hard"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: CardId,
    pub user_id: String,
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Consecutive successful reviews since the last lapse
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Unset means the card has never been scheduled and is never due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_ease_factor() -> f64 {
    DEFAULT_EASE_FACTOR
}

impl Flashcard {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review.is_some_and(|next| next <= now)
    }

    /// Applies every field the patch sets, leaving the rest untouched.
    pub fn apply(&mut self, patch: &FlashcardPatch) {
        if let Some(front) = &patch.front {
            self.front = front.clone();
        }
        if let Some(back) = &patch.back {
            self.back = back.clone();
        }
        if let Some(subject) = &patch.subject {
            self.subject = subject.clone();
        }
        if let Some(difficulty) = patch.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(repetitions) = patch.repetitions {
            self.repetitions = repetitions;
        }
        if let Some(ease_factor) = patch.ease_factor {
            self.ease_factor = ease_factor;
        }
        if let Some(last_reviewed) = patch.last_reviewed {
            self.last_reviewed = Some(last_reviewed);
        }
        if let Some(next_review) = patch.next_review {
            self.next_review = Some(next_review);
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Input for creating a card. Review state is filled in by the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcard {
    pub user_id: String,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Starting ease; any value is accepted, the first review re-clamps it.
    #[serde(default)]
    pub ease_factor: Option<f64>,
}

impl NewFlashcard {
    pub fn new(user_id: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            front: front.into(),
            back: back.into(),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

/// Partial update. `subject: Some(None)` clears the subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlashcardPatch {
    pub front: Option<String>,
    pub back: Option<String>,
    pub subject: Option<Option<String>>,
    pub difficulty: Option<Difficulty>,
    pub repetitions: Option<u32>,
    pub ease_factor: Option<f64>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FlashcardPatch {
    pub fn is_empty(&self) -> bool {
        *self == FlashcardPatch::default()
    }
}
