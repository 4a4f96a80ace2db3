//! # HomeGraph Pipeline
//!
//! Orchestration layer: sequences the scoring engines over the catalog,
//! persists their outputs through the store traits, and reports what
//! happened. See [`pipeline::EnrichmentPipeline`] for the phase
//! structure and [`report::RunReport`] for the accounting.

pub mod pipeline;
pub mod report;

pub use pipeline::EnrichmentPipeline;
pub use report::RunReport;
