//! Review scheduling service.
//!
//! `review` (in `models::sm2`) is the pure computation; `ReviewScheduler` wires it to a
//! card store and a clock: fetch the card, compute, persist. Recomputing from the same
//! card state is safe, so callers may retry a failed persist.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use log::{debug, info};

use crate::clock::Clock;
use crate::database::CardStore;
use crate::error::{Error, Result};
use crate::models::sm2;
use crate::models::{
    CardId, DEFAULT_EASE_FACTOR, Flashcard, FlashcardPatch, NewFlashcard, Quality, ReviewOutcome,
    ReviewStats,
};

/// Cards owned by `user_id` with `next_review <= now`, oldest due first.
///
/// Cards that were never scheduled are not due. Ties are broken by creation time, then id.
pub fn select_due<'a, I>(cards: I, user_id: &str, now: DateTime<Utc>) -> Vec<Flashcard>
where
    I: IntoIterator<Item = &'a Flashcard>,
{
    let mut due: Vec<Flashcard> = cards
        .into_iter()
        .filter(|card| card.user_id == user_id && card.is_due(now))
        .cloned()
        .collect();
    due.sort_by(|a, b| {
        a.next_review
            .cmp(&b.next_review)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    due
}

/// New-card intake and default ease.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerOptions {
    pub default_ease: f64,
    /// A new card first becomes due this many days after creation; 0 means immediately.
    pub new_card_delay_days: i64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            default_ease: DEFAULT_EASE_FACTOR,
            new_card_delay_days: 0,
        }
    }
}

pub struct ReviewScheduler<S, C> {
    store: S,
    clock: C,
    options: SchedulerOptions,
}

impl<S: CardStore, C: Clock> ReviewScheduler<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            options: SchedulerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The clock's time, truncated to the millisecond precision the stores keep.
    pub fn now(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
    }

    /// Creates a card with fresh review state. It enters the due set after the configured delay.
    pub fn create_card(&self, new: NewFlashcard) -> Result<Flashcard> {
        if new.user_id.trim().is_empty() {
            return Err(Error::InvalidArgument("user id cannot be empty".to_string()));
        }

        let now = self.now();
        let first_due = TimeDelta::try_days(self.options.new_card_delay_days)
            .and_then(|delay| now.checked_add_signed(delay))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "new card delay of {} days is out of range",
                    self.options.new_card_delay_days
                ))
            })?;

        let card = Flashcard {
            id: CardId::new(),
            user_id: new.user_id,
            front: new.front,
            back: new.back,
            subject: new.subject.filter(|s| !s.trim().is_empty()),
            difficulty: new.difficulty,
            repetitions: 0,
            ease_factor: new.ease_factor.unwrap_or(self.options.default_ease),
            last_reviewed: None,
            next_review: Some(first_due),
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&card)?;
        info!(
            "Created flashcard {} for user '{}', first due {first_due}",
            card.id, card.user_id
        );
        Ok(card)
    }

    pub fn get_card(&self, id: CardId) -> Result<Flashcard> {
        self.store.get(id)
    }

    pub fn list_cards(&self, user_id: &str, subject: Option<&str>) -> Result<Vec<Flashcard>> {
        self.store.list_for_user(user_id, subject)
    }

    /// Edits the card's content. Review state only changes through `review_card`,
    /// so any review fields in `patch` are ignored.
    pub fn edit_card(&self, id: CardId, patch: FlashcardPatch) -> Result<Flashcard> {
        let patch = FlashcardPatch {
            front: patch.front,
            back: patch.back,
            subject: patch.subject,
            difficulty: patch.difficulty,
            updated_at: Some(self.now()),
            ..Default::default()
        };
        let card = self.store.update(id, &patch)?;
        debug!("Edited flashcard {id}");
        Ok(card)
    }

    pub fn delete_card(&self, id: CardId) -> Result<()> {
        self.store.delete(id)?;
        info!("Deleted flashcard {id}");
        Ok(())
    }

    /// Grades a card and persists its new schedule.
    pub fn review_card(&self, id: CardId, quality: Quality) -> Result<(Flashcard, ReviewOutcome)> {
        let now = self.now();
        let card = self.store.get(id)?;
        let outcome = sm2::review(&card, quality, now);

        let updated = self.store.update(id, &outcome.to_patch())?;
        info!(
            "Reviewed flashcard {id} with quality {quality}: repetitions {} -> {}, ease {:.2} -> {:.2}, next in {} day(s)",
            card.repetitions,
            outcome.repetitions,
            card.ease_factor,
            outcome.ease_factor,
            outcome.interval_days
        );
        Ok((updated, outcome))
    }

    /// Like `review_card`, for a raw grade that has not been validated yet.
    pub fn grade_card(&self, id: CardId, grade: i64) -> Result<(Flashcard, ReviewOutcome)> {
        self.review_card(id, Quality::try_from(grade)?)
    }

    pub fn due_cards(&self, user_id: &str) -> Result<Vec<Flashcard>> {
        self.store.list_due_for_user(user_id, self.now())
    }

    pub fn stats(&self, user_id: &str) -> Result<ReviewStats> {
        let cards = self.store.list_for_user(user_id, None)?;
        Ok(ReviewStats::from_cards(&cards, self.now()))
    }
}
