//! SQLite card store
//!
//! Handles database initialization, flashcard CRUD, the due-card query,
//! and the persisted simulated date used to step through review days.

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::CardStore;
use crate::error::{Error, Result};
use crate::models::{CardId, Difficulty, Flashcard, FlashcardPatch};

const CARD_COLUMNS: &str = "id, user_id, front, back, subject, difficulty, repetitions, \
     ease_factor, last_reviewed, next_review, created_at, updated_at";

pub struct SqliteCardStore {
    conn: Mutex<Connection>,
}

impl SqliteCardStore {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening card database at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Creates tables for flashcards and app state.
    fn init(conn: Connection) -> Result<Self> {
        // Timestamps are unix milliseconds; NULL next_review means "never scheduled"
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                subject TEXT,
                difficulty TEXT NOT NULL DEFAULT 'medium',
                repetitions INTEGER NOT NULL DEFAULT 0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                last_reviewed INTEGER,
                next_review INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_flashcards_due
                ON flashcards (user_id, next_review);
            CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulated current date, if one has been set
    pub fn get_current_date(&self) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM app_state WHERE key = 'current_date'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                v.parse::<i64>()
                    .ok()
                    .and_then(DateTime::from_timestamp_millis)
                    .ok_or_else(|| Error::Config(format!("corrupt current_date in app_state: '{v}'")))
            })
            .transpose()
    }

    pub fn set_current_date(&self, date: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO app_state (key, value) VALUES ('current_date', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![date.timestamp_millis().to_string()],
        )?;
        Ok(())
    }

    /// Advances the simulated date by 24 hours, starting from `start` if none is set yet.
    pub fn advance_day(&self, start: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let current = self.get_current_date()?.unwrap_or(start);
        let next_day = current + TimeDelta::days(1);
        self.set_current_date(next_day)?;
        Ok(next_day)
    }

    /// Drops the simulated date so the wall clock is used again
    pub fn reset_current_date(&self) -> Result<()> {
        self.conn()
            .execute("DELETE FROM app_state WHERE key = 'current_date'", [])?;
        Ok(())
    }
}

fn fetch(conn: &Connection, id: CardId) -> Result<Flashcard> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM flashcards WHERE id = ?1"),
        params![id.to_string()],
        card_from_row,
    )
    .optional()?
    .ok_or(Error::NotFound(id))
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    let id: String = row.get(0)?;
    let difficulty: String = row.get(5)?;

    Ok(Flashcard {
        id: id
            .parse::<CardId>()
            .map_err(|e| conversion_error(0, e))?,
        user_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        subject: row.get(4)?,
        difficulty: difficulty
            .parse::<Difficulty>()
            .map_err(|e| conversion_error(5, e))?,
        repetitions: row.get(6)?,
        ease_factor: row.get(7)?,
        last_reviewed: row
            .get::<_, Option<i64>>(8)?
            .map(|ms| from_millis(8, ms))
            .transpose()?,
        next_review: row
            .get::<_, Option<i64>>(9)?
            .map(|ms| from_millis(9, ms))
            .transpose()?,
        created_at: from_millis(10, row.get(10)?)?,
        updated_at: from_millis(11, row.get(11)?)?,
    })
}

fn conversion_error(idx: usize, e: Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
}

fn from_millis(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn millis(date: Option<DateTime<Utc>>) -> Option<i64> {
    date.map(|d| d.timestamp_millis())
}

fn insert_row(conn: &Connection, card: &Flashcard) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO flashcards ({CARD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            card.id.to_string(),
            card.user_id,
            card.front,
            card.back,
            card.subject,
            card.difficulty.as_str(),
            card.repetitions,
            card.ease_factor,
            millis(card.last_reviewed),
            millis(card.next_review),
            card.created_at.timestamp_millis(),
            card.updated_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

impl CardStore for SqliteCardStore {
    fn insert(&self, card: &Flashcard) -> Result<()> {
        insert_row(&self.conn(), card)?;
        debug!("Inserted flashcard {} for user '{}'", card.id, card.user_id);
        Ok(())
    }

    fn insert_many(&self, cards: &[Flashcard]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for card in cards {
            insert_row(&tx, card)?;
        }
        tx.commit()?;
        debug!("Inserted {} flashcards", cards.len());
        Ok(())
    }

    fn get(&self, id: CardId) -> Result<Flashcard> {
        fetch(&self.conn(), id)
    }

    fn update(&self, id: CardId, patch: &FlashcardPatch) -> Result<Flashcard> {
        let conn = self.conn();
        let mut card = fetch(&conn, id)?;
        card.apply(patch);

        conn.execute(
            "UPDATE flashcards
             SET front = ?2, back = ?3, subject = ?4, difficulty = ?5, repetitions = ?6,
                 ease_factor = ?7, last_reviewed = ?8, next_review = ?9, updated_at = ?10
             WHERE id = ?1",
            params![
                id.to_string(),
                card.front,
                card.back,
                card.subject,
                card.difficulty.as_str(),
                card.repetitions,
                card.ease_factor,
                millis(card.last_reviewed),
                millis(card.next_review),
                card.updated_at.timestamp_millis(),
            ],
        )?;
        debug!("Updated flashcard {id}");
        // timestamps lose sub-millisecond precision on the way in
        fetch(&conn, id)
    }

    fn delete(&self, id: CardId) -> Result<()> {
        let removed = self
            .conn()
            .execute("DELETE FROM flashcards WHERE id = ?1", params![id.to_string()])?;
        if removed == 0 {
            return Err(Error::NotFound(id));
        }
        debug!("Deleted flashcard {id}");
        Ok(())
    }

    fn list_for_user(&self, user_id: &str, subject: Option<&str>) -> Result<Vec<Flashcard>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM flashcards
             WHERE user_id = ?1 AND (?2 IS NULL OR subject = ?2)
             ORDER BY created_at DESC, id ASC"
        ))?;

        let cards = stmt
            .query_map(params![user_id, subject], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("Loaded {} flashcards for user '{user_id}'", cards.len());
        Ok(cards)
    }

    fn list_due_for_user(
        &self,
        user_id: &str,
        before_or_equal: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM flashcards
             WHERE user_id = ?1 AND next_review IS NOT NULL AND next_review <= ?2
             ORDER BY next_review ASC, created_at ASC, id ASC"
        ))?;

        let cards = stmt
            .query_map(
                params![user_id, before_or_equal.timestamp_millis()],
                card_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(
            "{} flashcards due for user '{user_id}' at {before_or_equal}",
            cards.len()
        );
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_EASE_FACTOR;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
    }

    fn card(user: &str, front: &str, next_review: Option<DateTime<Utc>>) -> Flashcard {
        Flashcard {
            id: CardId::new(),
            user_id: user.to_string(),
            front: front.to_string(),
            back: format!("{front} (back)"),
            subject: None,
            difficulty: Difficulty::Medium,
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            last_reviewed: None,
            next_review,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let mut stored_card = card("alice", "dziękuję", Some(t0()));
        stored_card.subject = Some("polish".to_string());
        stored_card.difficulty = Difficulty::Hard;
        stored_card.last_reviewed = Some(t0() - TimeDelta::days(2));

        store.insert(&stored_card).unwrap();
        let loaded = store.get(stored_card.id).unwrap();

        assert_eq!(loaded, stored_card);
    }

    #[test]
    fn test_get_missing_card() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let id = CardId::new();
        assert!(matches!(store.get(id), Err(Error::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let c = card("alice", "proszę", None);
        store.insert(&c).unwrap();
        assert!(matches!(store.insert(&c), Err(Error::Database(_))));
    }

    #[test]
    fn test_update_applies_patch() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let c = card("alice", "cześć", None);
        store.insert(&c).unwrap();

        let patch = FlashcardPatch {
            repetitions: Some(2),
            ease_factor: Some(2.6),
            next_review: Some(t0() + TimeDelta::days(6)),
            subject: Some(Some("greetings".to_string())),
            ..Default::default()
        };
        let updated = store.update(c.id, &patch).unwrap();

        assert_eq!(updated.repetitions, 2);
        assert_eq!(updated.subject.as_deref(), Some("greetings"));
        assert_eq!(store.get(c.id).unwrap(), updated);
    }

    #[test]
    fn test_update_returns_row_as_stored() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let c = card("alice", "cześć", None);
        store.insert(&c).unwrap();

        let reviewed_at = t0() + TimeDelta::nanoseconds(4_567_891);
        let patch = FlashcardPatch {
            last_reviewed: Some(reviewed_at),
            next_review: Some(reviewed_at + TimeDelta::days(1)),
            updated_at: Some(reviewed_at),
            ..Default::default()
        };
        let updated = store.update(c.id, &patch).unwrap();

        assert_eq!(updated.last_reviewed, Some(t0() + TimeDelta::milliseconds(4)));
        assert_eq!(store.get(c.id).unwrap(), updated);
    }

    #[test]
    fn test_insert_many_is_all_or_nothing() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let taken = card("alice", "taken", None);
        store.insert(&taken).unwrap();

        let fresh = card("alice", "fresh", None);
        let result = store.insert_many(&[fresh.clone(), taken.clone()]);
        assert!(matches!(result, Err(Error::Database(_))));
        assert!(matches!(store.get(fresh.id), Err(Error::NotFound(_))));

        let other = card("alice", "other", None);
        store.insert_many(&[fresh.clone(), other.clone()]).unwrap();
        assert_eq!(store.list_for_user("alice", None).unwrap().len(), 3);
    }

    #[test]
    fn test_update_missing_card() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let result = store.update(CardId::new(), &FlashcardPatch::default());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let c = card("alice", "cześć", None);
        store.insert(&c).unwrap();

        store.delete(c.id).unwrap();
        assert!(matches!(store.get(c.id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete(c.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_for_user_filters_by_owner_and_subject() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let mut older = card("alice", "a", None);
        older.subject = Some("math".to_string());
        let mut newer = card("alice", "b", None);
        newer.created_at = t0() + TimeDelta::hours(1);
        let other = card("bob", "c", None);

        for c in [&older, &newer, &other] {
            store.insert(c).unwrap();
        }

        let all: Vec<_> = store
            .list_for_user("alice", None)
            .unwrap()
            .into_iter()
            .map(|c| c.front)
            .collect();
        assert_eq!(all, vec!["b", "a"]);

        let math = store.list_for_user("alice", Some("math")).unwrap();
        assert_eq!(math.len(), 1);
        assert_eq!(math[0].id, older.id);
    }

    #[test]
    fn test_due_query_orders_and_filters() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let now = t0();
        let late = card("alice", "late", Some(now - TimeDelta::days(3)));
        let recent = card("alice", "recent", Some(now - TimeDelta::hours(1)));
        let exact = card("alice", "exact", Some(now));
        let future = card("alice", "future", Some(now + TimeDelta::seconds(1)));
        let unscheduled = card("alice", "new", None);
        let foreign = card("bob", "foreign", Some(now - TimeDelta::days(9)));

        for c in [&recent, &future, &late, &unscheduled, &exact, &foreign] {
            store.insert(c).unwrap();
        }

        let due: Vec<_> = store
            .list_due_for_user("alice", now)
            .unwrap()
            .into_iter()
            .map(|c| c.front)
            .collect();
        assert_eq!(due, vec!["late", "recent", "exact"]);
    }

    #[test]
    fn test_simulated_date() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        assert_eq!(store.get_current_date().unwrap(), None);

        let next = store.advance_day(t0()).unwrap();
        assert_eq!(next, t0() + TimeDelta::days(1));
        assert_eq!(store.get_current_date().unwrap(), Some(next));

        let next = store.advance_day(t0()).unwrap();
        assert_eq!(next, t0() + TimeDelta::days(2));

        store.reset_current_date().unwrap();
        assert_eq!(store.get_current_date().unwrap(), None);
    }

    #[test]
    fn test_reopen_file_keeps_cards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.sqlite3");
        let c = card("alice", "persisted", Some(t0()));

        SqliteCardStore::open(&path).unwrap().insert(&c).unwrap();
        let reopened = SqliteCardStore::open(&path).unwrap();

        assert_eq!(reopened.get(c.id).unwrap(), c);
    }
}
