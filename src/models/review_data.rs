use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FlashcardPatch;

/// Updated review fields produced by one review, plus the interval that was chosen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: i64,
    pub last_reviewed: DateTime<Utc>,
    pub next_review: DateTime<Utc>,
}

impl ReviewOutcome {
    /// Patch carrying the four scheduler-owned fields; `updated_at` follows the review time.
    pub fn to_patch(&self) -> FlashcardPatch {
        FlashcardPatch {
            repetitions: Some(self.repetitions),
            ease_factor: Some(self.ease_factor),
            last_reviewed: Some(self.last_reviewed),
            next_review: Some(self.next_review),
            updated_at: Some(self.last_reviewed),
            ..Default::default()
        }
    }
}
