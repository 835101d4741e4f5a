//! Command handlers for the flashcards CLI.
//! Owns the scheduler over the SQLite store and renders results as plain text or JSON.

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use flashcards_review::export::{export_cards, import_cards};
use flashcards_review::{
    CardId, Clock, Config, Difficulty, FixedClock, Flashcard, FlashcardPatch, NewFlashcard,
    Quality, ReviewScheduler, ReviewSession, SqliteCardStore, SystemClock,
};
use log::debug;
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::OutputFormat;

pub struct App {
    scheduler: ReviewScheduler<SqliteCardStore, Box<dyn Clock>>,
    user_id: String,
    format: OutputFormat,
}

/// Formats a timestamp as a local YYYY-MM-DD HH:MM string
fn format_time(time: DateTime<Utc>) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Format an interval in days to a short human-readable string
fn format_interval(days: i64) -> String {
    match days {
        i64::MIN..=0 => "now".to_string(),
        1..=6 => format!("{days}d"),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

impl App {
    /// Opens the database and picks the clock: the stored simulated date if one is set,
    /// otherwise the wall clock.
    pub fn open(config: &Config, format: OutputFormat) -> anyhow::Result<Self> {
        let store = SqliteCardStore::open(&config.db_path)
            .with_context(|| format!("opening {}", config.db_path.display()))?;
        Self::with_store(store, config, format)
    }

    pub fn with_store(
        store: SqliteCardStore,
        config: &Config,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let clock: Box<dyn Clock> = match store.get_current_date()? {
            Some(date) => {
                debug!("Using simulated date {date}");
                Box::new(FixedClock::new(date))
            }
            None => Box::new(SystemClock),
        };

        Ok(Self {
            scheduler: ReviewScheduler::new(store, clock)
                .with_options(config.scheduler_options()),
            user_id: config.user_id.clone(),
            format,
        })
    }

    fn print_card(&self, out: &mut impl Write, card: &Flashcard) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(card)?)?,
            OutputFormat::Plain => {
                writeln!(out, "{}", card.id)?;
                writeln!(out, "  front:      {}", card.front)?;
                writeln!(out, "  back:       {}", card.back)?;
                if let Some(subject) = &card.subject {
                    writeln!(out, "  subject:    {subject}")?;
                }
                writeln!(out, "  difficulty: {}", card.difficulty)?;
                writeln!(
                    out,
                    "  reps: {}  ease: {:.2}",
                    card.repetitions, card.ease_factor
                )?;
                if let Some(last) = card.last_reviewed {
                    writeln!(out, "  last:       {}", format_time(last))?;
                }
                match card.next_review {
                    Some(next) => writeln!(out, "  next:       {}", format_time(next))?,
                    None => writeln!(out, "  next:       not scheduled")?,
                }
            }
        }
        Ok(())
    }

    fn print_list(&self, out: &mut impl Write, cards: &[Flashcard]) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(cards)?)?,
            OutputFormat::Plain => {
                if cards.is_empty() {
                    writeln!(out, "No cards.")?;
                }
                for card in cards {
                    let next = card
                        .next_review
                        .map(format_time)
                        .unwrap_or_else(|| "-".to_string());
                    writeln!(out, "{}  {:<16}  {}", card.id, next, card.front)?;
                }
            }
        }
        Ok(())
    }

    pub fn add(
        &self,
        out: &mut impl Write,
        front: String,
        back: String,
        subject: Option<String>,
        difficulty: Difficulty,
    ) -> anyhow::Result<()> {
        let mut new = NewFlashcard::new(self.user_id.clone(), front, back).with_difficulty(difficulty);
        new.subject = subject;
        let card = self.scheduler.create_card(new)?;
        self.print_card(out, &card)
    }

    pub fn list(&self, out: &mut impl Write, subject: Option<&str>) -> anyhow::Result<()> {
        let cards = self.scheduler.list_cards(&self.user_id, subject)?;
        self.print_list(out, &cards)
    }

    pub fn show(&self, out: &mut impl Write, id: CardId) -> anyhow::Result<()> {
        let card = self.owned_card(id)?;
        self.print_card(out, &card)
    }

    pub fn edit(
        &self,
        out: &mut impl Write,
        id: CardId,
        front: Option<String>,
        back: Option<String>,
        subject: Option<String>,
        difficulty: Option<Difficulty>,
    ) -> anyhow::Result<()> {
        self.owned_card(id)?;
        let patch = FlashcardPatch {
            front,
            back,
            subject: subject.map(|s| Some(s).filter(|s| !s.trim().is_empty())),
            difficulty,
            ..Default::default()
        };
        let card = self.scheduler.edit_card(id, patch)?;
        self.print_card(out, &card)
    }

    pub fn delete(&self, out: &mut impl Write, id: CardId) -> anyhow::Result<()> {
        self.owned_card(id)?;
        self.scheduler.delete_card(id)?;
        writeln!(out, "Deleted {id}")?;
        Ok(())
    }

    pub fn due(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let cards = self.scheduler.due_cards(&self.user_id)?;
        self.print_list(out, &cards)
    }

    pub fn review(&self, out: &mut impl Write, id: CardId, quality: i64) -> anyhow::Result<()> {
        self.owned_card(id)?;
        let (card, outcome) = self.scheduler.grade_card(id, quality)?;
        match self.format {
            OutputFormat::Json => writeln!(
                out,
                "{}",
                serde_json::to_string_pretty(&json!({ "card": card, "outcome": outcome }))?
            )?,
            OutputFormat::Plain => writeln!(
                out,
                "Next review in {} ({}), ease {:.2}, repetitions {}",
                format_interval(outcome.interval_days),
                format_time(outcome.next_review),
                outcome.ease_factor,
                outcome.repetitions
            )?,
        }
        Ok(())
    }

    /// Interactive session: show the front, wait for Enter, show the back, read a grade.
    /// `q` quits; progress made so far is already saved.
    pub fn study(&self, input: &mut impl BufRead, out: &mut impl Write) -> anyhow::Result<()> {
        let mut session = ReviewSession::start(&self.scheduler, &self.user_id)?;
        if session.is_completed() {
            writeln!(out, "Nothing due. Come back later!")?;
            return Ok(());
        }

        let mut line = String::new();
        let mut round = 0;
        while let Some(card) = session.current_card().cloned() {
            if session.round_number != round {
                round = session.round_number;
                writeln!(out, "== {} ==", session.phase_message())?;
            }
            writeln!(out, "\nQ: {}", card.front)?;
            write!(out, "[Enter] to reveal ")?;
            out.flush()?;
            line.clear();
            if input.read_line(&mut line)? == 0 || line.trim() == "q" {
                break;
            }
            session.toggle_back();
            writeln!(out, "A: {}", card.back)?;

            let quality = loop {
                write!(out, "Grade 0-5 (q to quit): ")?;
                out.flush()?;
                line.clear();
                if input.read_line(&mut line)? == 0 || line.trim() == "q" {
                    break None;
                }
                match line.trim().parse::<i64>().map_err(anyhow::Error::from).and_then(|g| {
                    Quality::try_from(g).map_err(anyhow::Error::from)
                }) {
                    Ok(quality) => break Some(quality),
                    Err(e) => writeln!(out, "{e}")?,
                }
            };
            let Some(quality) = quality else {
                break;
            };

            let outcome = session.grade_current_card(&self.scheduler, quality)?;
            writeln!(
                out,
                "Next review in {}",
                format_interval(outcome.interval_days)
            )?;
        }

        writeln!(out, "\n{}", session.phase_message())?;
        Ok(())
    }

    pub fn stats(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let stats = self.scheduler.stats(&self.user_id)?;
        match self.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?,
            OutputFormat::Plain => {
                writeln!(out, "Cards:     {}", stats.total)?;
                writeln!(out, "New:       {}", stats.new)?;
                writeln!(out, "Scheduled: {}", stats.scheduled)?;
                writeln!(out, "Due now:   {}", stats.due)?;
                writeln!(out, "Mature:    {}", stats.mature)?;
            }
        }
        Ok(())
    }

    pub fn export(&self, out: &mut impl Write, path: &Path) -> anyhow::Result<()> {
        let count = export_cards(&self.scheduler, &self.user_id, path)?;
        writeln!(out, "Exported {count} cards to {}", path.display())?;
        Ok(())
    }

    pub fn import(&self, out: &mut impl Write, path: &Path) -> anyhow::Result<()> {
        let count = import_cards(&self.scheduler, &self.user_id, path)
            .with_context(|| format!("importing {}", path.display()))?;
        writeln!(out, "Imported {count} cards from {}", path.display())?;
        Ok(())
    }

    pub fn advance_day(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let date = self.scheduler.store().advance_day(self.scheduler.now())?;
        writeln!(out, "Simulated date is now {}", format_time(date))?;
        Ok(())
    }

    pub fn reset_date(&self, out: &mut impl Write) -> anyhow::Result<()> {
        self.scheduler.store().reset_current_date()?;
        writeln!(out, "Using the real date again")?;
        Ok(())
    }

    /// Cards belonging to another user are reported as missing.
    fn owned_card(&self, id: CardId) -> anyhow::Result<Flashcard> {
        let card = self.scheduler.get_card(id)?;
        if card.user_id != self.user_id {
            return Err(flashcards_review::Error::NotFound(id).into());
        }
        Ok(card)
    }
}
