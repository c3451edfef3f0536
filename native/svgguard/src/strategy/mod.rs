//! Execution Strategy Module
//!
//! - Single document: `validator::check` on the calling thread
//! - Batches: `parallel`, Rayon work-stealing across documents

pub mod parallel;

pub use parallel::{extract_dimensions_batch, validate_batch};
