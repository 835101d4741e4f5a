use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Flashcard;

/// Repetitions at which a card counts as mature
pub const MATURE_REPETITIONS: u32 = 3;

/// Snapshot of one user's collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total: usize,
    /// Never reviewed
    pub new: usize,
    /// Has a next review date
    pub scheduled: usize,
    pub due: usize,
    pub mature: usize,
}

impl ReviewStats {
    pub fn from_cards(cards: &[Flashcard], now: DateTime<Utc>) -> Self {
        cards.iter().fold(Self::default(), |mut stats, card| {
            stats.total += 1;
            if card.last_reviewed.is_none() {
                stats.new += 1;
            }
            if card.next_review.is_some() {
                stats.scheduled += 1;
            }
            if card.is_due(now) {
                stats.due += 1;
            }
            if card.repetitions >= MATURE_REPETITIONS {
                stats.mature += 1;
            }
            stats
        })
    }
}
