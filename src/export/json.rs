//! JSON import/export of a user's flashcards.
//! Review state travels with the cards, so an imported collection keeps its schedule.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::clock::Clock;
use crate::database::CardStore;
use crate::error::{Error, Result};
use crate::models::{CardId, Flashcard};
use crate::scheduler::ReviewScheduler;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardExport {
    pub user_id: String,
    pub flashcards: Vec<Flashcard>,
}

/// Writes every card owned by `user_id` to `path` as pretty-printed JSON.
/// Returns the number of cards written.
pub fn export_cards<S: CardStore, C: Clock>(
    scheduler: &ReviewScheduler<S, C>,
    user_id: &str,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let export = CardExport {
        user_id: user_id.to_string(),
        flashcards: scheduler.list_cards(user_id, None)?,
    };

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, &export)?;
    writer.flush()?;

    info!(
        "Exported {} flashcards for '{user_id}' to '{}'",
        export.flashcards.len(),
        path.as_ref().display()
    );
    Ok(export.flashcards.len())
}

pub fn read_export(path: impl AsRef<Path>) -> Result<CardExport> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}

/// Imports cards from an export file into `user_id`'s collection.
///
/// Each card gets a fresh id and the new owner; its review state is kept as-is,
/// so cards exported without a `nextReview` stay unscheduled until reviewed.
/// The cards are stored as one batch: either all of them are imported or none are.
/// Returns the number of cards imported.
pub fn import_cards<S: CardStore, C: Clock>(
    scheduler: &ReviewScheduler<S, C>,
    user_id: &str,
    path: impl AsRef<Path>,
) -> Result<usize> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidArgument("user id cannot be empty".to_string()));
    }
    let export = read_export(path.as_ref())?;
    let now = scheduler.now();

    let imported: Vec<Flashcard> = export
        .flashcards
        .into_iter()
        .map(|card| Flashcard {
            id: CardId::new(),
            user_id: user_id.to_string(),
            updated_at: now,
            ..card
        })
        .collect();
    let count = imported.len();
    scheduler.store().insert_many(&imported)?;

    info!(
        "Imported {count} flashcards from '{}' (exported by '{}') for '{user_id}'",
        path.as_ref().display(),
        export.user_id
    );
    Ok(count)
}
