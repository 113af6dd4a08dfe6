pub mod chat;
pub mod goal;
pub mod log_entry;

pub use chat::{ChatMessage, Role};
pub use goal::{Category, Goal};
pub use log_entry::LogEntry;
