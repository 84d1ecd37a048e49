//! Conveyor Planner
//!
//! Turns a declarative pipeline document into a compiled pipeline
//! (templates merged, conditions parsed, jobs grouped into the declared
//! stage order) and, per triggering event, into a concrete execution
//! plan. All definition errors surface here, before anything runs.

pub mod graph;
pub mod planner;
pub mod resolve;

pub use graph::GraphBuilder;
pub use planner::{CompiledPipeline, Planner, compile};
pub use resolve::TemplateResolver;
