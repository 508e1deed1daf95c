//! # Brain Module
//!
//! Fast, rule-based routing for the MarketPulse assistant.
//! Decides what the assistant says BEFORE anything is scheduled for display.
//!
//! ## Components
//! - `category`: Topic buckets
//! - `classifier`: Keyword classification in priority order (total, pure)
//! - `selector`: Round-robin selection from the response bank

pub mod category;
pub mod classifier;
pub mod selector;

// Re-export main types for convenience
pub use category::Category;
pub use classifier::{CategoryMatch, Classifier, KeywordClassifier, KeywordRule};
pub use selector::{ResponseSelector, SelectedResponse};
