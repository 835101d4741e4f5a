mod app;

use clap::{Parser, Subcommand};
use flashcards_review::{CardId, Config, Difficulty};
use std::io;
use std::path::PathBuf;

use app::App;

#[derive(Parser)]
#[command(name = "flashcards", about = "Spaced-repetition flashcards", version)]
struct Cli {
    /// SQLite database file (overrides FLASHCARDS_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Owner of the cards (overrides FLASHCARDS_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create a flashcard
    Add {
        front: String,
        back: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
    },

    /// List flashcards, newest first
    List {
        /// Only cards with this subject
        #[arg(long)]
        subject: Option<String>,
    },

    /// Show one flashcard
    Show { id: CardId },

    /// Edit a flashcard's content
    Edit {
        id: CardId,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
        /// New subject; an empty string clears it
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    /// Delete a flashcard
    Delete { id: CardId },

    /// List cards due for review, longest overdue first
    Due,

    /// Grade one card (0-5) and reschedule it
    Review {
        id: CardId,
        #[arg(allow_negative_numbers = true)]
        quality: i64,
    },

    /// Review every due card interactively
    Study,

    /// Collection statistics
    Stats,

    /// Export your cards to a JSON file
    Export { path: PathBuf },

    /// Import cards from a JSON file
    Import { path: PathBuf },

    /// Move the simulated date forward by one day
    AdvanceDay,

    /// Go back to the real date
    ResetDate,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(user) = cli.user {
        config.user_id = user;
    }
    config.validate()?;

    let app = App::open(&config, cli.format)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Add {
            front,
            back,
            subject,
            difficulty,
        } => app.add(&mut out, front, back, subject, difficulty)?,
        Command::List { subject } => app.list(&mut out, subject.as_deref())?,
        Command::Show { id } => app.show(&mut out, id)?,
        Command::Edit {
            id,
            front,
            back,
            subject,
            difficulty,
        } => app.edit(&mut out, id, front, back, subject, difficulty)?,
        Command::Delete { id } => app.delete(&mut out, id)?,
        Command::Due => app.due(&mut out)?,
        Command::Review { id, quality } => app.review(&mut out, id, quality)?,
        Command::Study => {
            let stdin = io::stdin();
            app.study(&mut stdin.lock(), &mut out)?
        }
        Command::Stats => app.stats(&mut out)?,
        Command::Export { path } => app.export(&mut out, &path)?,
        Command::Import { path } => app.import(&mut out, &path)?,
        Command::AdvanceDay => app.advance_day(&mut out)?,
        Command::ResetDate => app.reset_date(&mut out)?,
    }

    Ok(())
}
