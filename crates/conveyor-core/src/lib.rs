//! Conveyor Core
//!
//! Core domain types, traits, and error handling for Conveyor.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across all other crates: the declarative pipeline document, the
//! event context and condition language, derived plans, and execution
//! outcomes.

pub mod condition;
pub mod context;
pub mod duration;
pub mod error;
pub mod ids;
pub mod interpolation;
pub mod outcome;
pub mod pipeline;
pub mod plan;
pub mod ports;
pub mod secrets;

pub use error::{Error, Result};
pub use ids::RunId;
