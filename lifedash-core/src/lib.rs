pub mod config;
pub mod error;
pub mod future_chat;
pub mod llm;
pub mod models;
pub mod protocol;
pub mod stats;
pub mod store;

pub use config::LifedashConfig;
pub use error::LifedashError;
pub use future_chat::{ChatContext, FutureSelfPrompt, Horizon, Tone};
pub use llm::{ChatBackend, ChatConfig, LlmError, OpenAiChatClient};
pub use models::{Category, ChatMessage, Goal, LogEntry, Role};
pub use store::JsonStore;
