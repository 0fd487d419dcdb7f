//! quizmate-core: Quiz session engine, answer evaluation, and statistics.
//!
//! This crate defines the question model, the content bundle parser, and the
//! session state machine that the rest of quizmate builds on.

pub mod bank;
pub mod clock;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod report;
pub mod session;
pub mod statistics;
pub mod streak;
pub mod traits;
