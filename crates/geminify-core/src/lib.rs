pub mod ai;
pub mod command;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod request;
pub mod state;
pub mod stream;

// Re-export main types for convenience
pub use ai::{GeminiClient, GenerateRequest, LanguageModel};
pub use command::Command;
pub use config::Preferences;
pub use diff::{render_diff, DiffSegment, SegmentKind};
pub use error::{ApiError, ErrorKind, GeminiError};
pub use history::{HistoryEntry, HistorySink, SqliteHistory};
pub use notify::{LiveView, Notification, Notifier};
pub use orchestrator::Orchestrator;
pub use request::{Attachment, RequestSpec};
pub use state::{ChatMessage, ChatRole, CommandOptions, Launch, Page, Session};
