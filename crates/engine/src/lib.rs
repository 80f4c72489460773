#![forbid(unsafe_code)]

mod changes;
mod document;
mod engine;
mod error;

pub use changes::{ChangeSet, TableChanges};
pub use document::Document;
pub use engine::HistoryEngine;
pub use error::HistoryError;
