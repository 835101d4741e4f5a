//! In-memory card store for tests and embedders that persist elsewhere.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::CardStore;
use crate::error::{Error, Result};
use crate::models::{CardId, Flashcard, FlashcardPatch};
use crate::scheduler::select_due;

#[derive(Default)]
pub struct MemoryCardStore {
    cards: Mutex<HashMap<CardId, Flashcard>>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cards(&self) -> MutexGuard<'_, HashMap<CardId, Flashcard>> {
        self.cards.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.cards().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards().is_empty()
    }
}

impl CardStore for MemoryCardStore {
    fn insert(&self, card: &Flashcard) -> Result<()> {
        let mut cards = self.cards();
        if cards.contains_key(&card.id) {
            return Err(Error::InvalidArgument(format!(
                "card {} already exists",
                card.id
            )));
        }
        cards.insert(card.id, card.clone());
        Ok(())
    }

    fn insert_many(&self, batch: &[Flashcard]) -> Result<()> {
        let mut cards = self.cards();
        let mut ids = HashSet::new();
        if let Some(taken) = batch
            .iter()
            .find(|c| cards.contains_key(&c.id) || !ids.insert(c.id))
        {
            return Err(Error::InvalidArgument(format!(
                "card {} already exists",
                taken.id
            )));
        }
        for card in batch {
            cards.insert(card.id, card.clone());
        }
        Ok(())
    }

    fn get(&self, id: CardId) -> Result<Flashcard> {
        self.cards().get(&id).cloned().ok_or(Error::NotFound(id))
    }

    fn update(&self, id: CardId, patch: &FlashcardPatch) -> Result<Flashcard> {
        let mut cards = self.cards();
        let card = cards.get_mut(&id).ok_or(Error::NotFound(id))?;
        card.apply(patch);
        Ok(card.clone())
    }

    fn delete(&self, id: CardId) -> Result<()> {
        self.cards()
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NotFound(id))
    }

    fn list_for_user(&self, user_id: &str, subject: Option<&str>) -> Result<Vec<Flashcard>> {
        let mut cards: Vec<Flashcard> = self
            .cards()
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| subject.is_none() || c.subject.as_deref() == subject)
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(cards)
    }

    fn list_due_for_user(
        &self,
        user_id: &str,
        before_or_equal: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        Ok(select_due(self.cards().values(), user_id, before_or_equal))
    }
}
