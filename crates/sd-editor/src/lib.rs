pub mod clipboard;
pub mod config;
pub mod history;
pub mod replay;
pub mod session;
pub mod undo;

pub use config::HistoryConfig;
pub use history::{EntryState, HistoryEntry, HistoryView};
pub use session::{Axis, EditError, EditorSession, PendingConnection};
pub use undo::{HistoryChange, HistoryError, Post, PostKind, UndoStack};
