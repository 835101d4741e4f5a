pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use database::{CardStore, MemoryCardStore, SqliteCardStore};
pub use error::{Error, Result};
pub use models::{
    CardId, Difficulty, Flashcard, FlashcardPatch, NewFlashcard, Quality, ReviewOutcome,
    ReviewSession, ReviewStats,
};
pub use scheduler::{ReviewScheduler, SchedulerOptions, select_due};
