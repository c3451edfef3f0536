//! DOM Module
//!
//! Strict document parsing for untrusted markup:
//! - Non-recovering well-formedness checks over the event stream
//! - Namespace prefix scoping
//! - Owned root element summary for callers

pub mod document;
pub mod namespace;

pub use document::{ParseOptions, ParsedDocument};
