//! Test Module
//!
//! Cross-module test suite for the MarketPulse engine.
//!
//! ## Test Categories
//! - `brain_tests`: Keyword classification and round-robin selection
//! - `session_tests`: The synchronous session state machine
//! - `actor_tests`: Session actor, scheduler timing and event sinks
//! - `config_tests`: Configuration and response bank files
//! - `integration_tests`: Full conversations through the public handle
