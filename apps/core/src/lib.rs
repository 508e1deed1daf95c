//! MarketPulse assistant engine.
//!
//! Routes free text to a marketing topic with a keyword classifier, then plays
//! back a scripted trend / insight / recommendation sequence for that topic,
//! one message at a time.

pub mod actors;
pub mod bank;
pub mod brain;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod session;
pub mod telemetry;

pub use actors::messages::{SessionEvent, SessionSnapshot, Submission};
pub use actors::session::SessionHandle;
pub use actors::traits::EventSink;
pub use bank::ResponseBank;
pub use brain::{Category, Classifier, KeywordClassifier};
pub use config::AssistantConfig;
pub use error::AppError;
pub use models::{Message, MessageKind, Sender};

#[cfg(test)]
mod tests;
