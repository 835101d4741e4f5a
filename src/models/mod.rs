pub mod flashcard;
pub mod quality;
pub mod review_data;
pub mod review_session;
pub mod review_stats;
pub mod sm2;

pub use flashcard::{CardId, DEFAULT_EASE_FACTOR, Difficulty, Flashcard, FlashcardPatch, NewFlashcard};
pub use quality::Quality;
pub use review_data::ReviewOutcome;
pub use review_session::ReviewSession;
pub use review_stats::ReviewStats;
