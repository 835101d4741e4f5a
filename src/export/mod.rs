pub mod json;

pub use json::{CardExport, export_cards, import_cards};
