//! Card persistence.
//!
//! `CardStore` is the seam between the scheduler and whatever holds the cards.
//! Two implementations ship: SQLite for the CLI and an in-memory map for tests
//! and embedders.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CardId, Flashcard, FlashcardPatch};

pub mod db;
pub mod memory;

pub use db::SqliteCardStore;
pub use memory::MemoryCardStore;

pub trait CardStore {
    /// Stores a fully built card. Fails if the id is already taken.
    fn insert(&self, card: &Flashcard) -> Result<()>;

    /// Stores every card in `cards`, or none of them if any insert fails.
    fn insert_many(&self, cards: &[Flashcard]) -> Result<()>;

    /// Fails with `NotFound` if the card does not exist.
    fn get(&self, id: CardId) -> Result<Flashcard>;

    /// Applies `patch` and returns the stored card. Fails with `NotFound` if the card does not exist.
    fn update(&self, id: CardId, patch: &FlashcardPatch) -> Result<Flashcard>;

    /// Fails with `NotFound` if the card does not exist.
    fn delete(&self, id: CardId) -> Result<()>;

    /// All cards owned by `user_id`, newest first, optionally restricted to one subject.
    fn list_for_user(&self, user_id: &str, subject: Option<&str>) -> Result<Vec<Flashcard>>;

    /// Cards owned by `user_id` with `next_review <= before_or_equal`, oldest due first.
    /// Cards that were never scheduled are not returned.
    fn list_due_for_user(
        &self,
        user_id: &str,
        before_or_equal: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>>;
}

impl<S: CardStore + ?Sized> CardStore for &S {
    fn insert(&self, card: &Flashcard) -> Result<()> {
        (**self).insert(card)
    }

    fn insert_many(&self, cards: &[Flashcard]) -> Result<()> {
        (**self).insert_many(cards)
    }

    fn get(&self, id: CardId) -> Result<Flashcard> {
        (**self).get(id)
    }

    fn update(&self, id: CardId, patch: &FlashcardPatch) -> Result<Flashcard> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: CardId) -> Result<()> {
        (**self).delete(id)
    }

    fn list_for_user(&self, user_id: &str, subject: Option<&str>) -> Result<Vec<Flashcard>> {
        (**self).list_for_user(user_id, subject)
    }

    fn list_due_for_user(
        &self,
        user_id: &str,
        before_or_equal: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        (**self).list_due_for_user(user_id, before_or_equal)
    }
}
