//! Review session management.
//! Runs multi-round review over the due set; lapsed cards come back in the next round.

use crate::clock::Clock;
use crate::database::CardStore;
use crate::error::{Error, Result};
use crate::scheduler::ReviewScheduler;

use super::{Flashcard, Quality, ReviewOutcome};

/// Manages one sitting of reviews with multiple rounds.
/// Cards graded below 3 are repeated in subsequent rounds.
pub struct ReviewSession {
    pub user_id: String,
    cards: Vec<SessionCard>,
    current_round_cards: Vec<usize>,
    current_index: usize,
    pub show_back: bool,
    pub round_number: usize,
}

struct SessionCard {
    card: Flashcard,
    passed: bool,
}

impl ReviewSession {
    /// Starts a session over the cards currently due for `user_id`.
    pub fn start<S: CardStore, C: Clock>(
        scheduler: &ReviewScheduler<S, C>,
        user_id: &str,
    ) -> Result<Self> {
        let due = scheduler.due_cards(user_id)?;
        Ok(Self::from_cards(user_id, due))
    }

    pub fn from_cards(user_id: impl Into<String>, cards: Vec<Flashcard>) -> Self {
        let cards: Vec<SessionCard> = cards
            .into_iter()
            .map(|card| SessionCard {
                card,
                passed: false,
            })
            .collect();
        let indices = (0..cards.len()).collect();

        Self {
            user_id: user_id.into(),
            cards,
            current_round_cards: indices,
            current_index: 0,
            show_back: false,
            round_number: 1,
        }
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        if self.is_completed() {
            return None;
        }
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
            .map(|entry| &entry.card)
    }

    pub fn toggle_back(&mut self) {
        self.show_back = !self.show_back;
    }

    /// Grades the current card, persists the new schedule and moves on.
    pub fn grade_current_card<S: CardStore, C: Clock>(
        &mut self,
        scheduler: &ReviewScheduler<S, C>,
        quality: Quality,
    ) -> Result<ReviewOutcome> {
        let idx = self
            .current_round_cards
            .get(self.current_index)
            .copied()
            .ok_or_else(|| Error::InvalidArgument("review session has no current card".to_string()))?;

        let entry = &mut self.cards[idx];
        let (updated, outcome) = scheduler.review_card(entry.card.id, quality)?;
        entry.card = updated;
        entry.passed = quality.is_success();

        self.next_card();
        Ok(outcome)
    }

    fn next_card(&mut self) {
        self.show_back = false;
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the cards that were not passed.
    /// If none remain the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| !self.cards[idx].passed)
            .collect();

        self.current_index = 0;
        if failed.is_empty() {
            self.current_round_cards.clear();
            return;
        }
        self.current_round_cards = failed;
        self.round_number += 1;
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| self.cards[idx].passed)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    /// Every card reviewed in this session, with its latest state
    pub fn cards(&self) -> impl Iterator<Item = &Flashcard> {
        self.cards.iter().map(|entry| &entry.card)
    }

    pub fn is_completed(&self) -> bool {
        self.current_round_cards.is_empty()
    }

    pub fn phase_message(&self) -> String {
        if self.is_completed() {
            format!("Session complete: {} cards reviewed", self.cards.len())
        } else if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.total_count()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::MemoryCardStore;
    use crate::models::NewFlashcard;
    use chrono::{TimeZone, Utc};

    fn scheduler() -> ReviewScheduler<MemoryCardStore, FixedClock> {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 18, 0, 0).unwrap());
        ReviewScheduler::new(MemoryCardStore::new(), clock)
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    #[test]
    fn test_empty_session_is_complete() {
        let s = scheduler();
        let mut session = ReviewSession::start(&s, "alice").unwrap();

        assert!(session.is_completed());
        assert!(session.current_card().is_none());
        assert!(matches!(
            session.grade_current_card(&s, q(5)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_failed_cards_repeat_in_next_round() {
        let s = scheduler();
        for front in ["one", "two", "three"] {
            s.create_card(NewFlashcard::new("alice", front, "x")).unwrap();
        }
        let mut session = ReviewSession::start(&s, "alice").unwrap();
        assert_eq!(session.total_count(), 3);
        assert_eq!(session.phase_message(), "Round 1: 3 cards");

        let mut failed_front = String::new();
        for grade in [5, 1, 4] {
            if grade < 3 {
                failed_front = session.current_card().unwrap().front.clone();
            }
            session.grade_current_card(&s, q(grade)).unwrap();
        }

        assert_eq!(session.round_number, 2);
        assert_eq!(session.total_count(), 1);
        assert_eq!(session.remaining_count(), 1);
        assert_eq!(session.current_card().unwrap().front, failed_front);
        assert_eq!(session.phase_message(), "Round 2 (Review): 1 cards to retry");

        // second attempt in the same sitting restarts the schedule at one day
        let outcome = session.grade_current_card(&s, q(3)).unwrap();
        assert_eq!(outcome.repetitions, 1);
        assert_eq!(outcome.interval_days, 1);
        assert!(session.is_completed());
        assert!(s.due_cards("alice").unwrap().is_empty());
    }

    #[test]
    fn test_grading_persists_and_updates_session_copy() {
        let s = scheduler();
        let card = s.create_card(NewFlashcard::new("alice", "a", "b")).unwrap();
        let mut session = ReviewSession::start(&s, "alice").unwrap();

        session.toggle_back();
        assert!(session.show_back);
        session.grade_current_card(&s, q(4)).unwrap();
        assert!(!session.show_back);

        let stored = s.get_card(card.id).unwrap();
        let in_session = session.cards().next().unwrap();
        assert_eq!(&stored, in_session);
        assert_eq!(stored.repetitions, 1);
    }
}
