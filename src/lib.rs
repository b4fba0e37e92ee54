//! Merge a sample's variant caller export with its ANNOVAR annotations and
//! produce the full, filtered and summary review tables.
//!
//! ```text
//!  Args ──► PipelineConfig + SampleTables ──► pipeline::merge ──► Reports
//!                                                   │
//!                       data::{join, split, filter} + classify
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
