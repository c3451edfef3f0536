//! Parallel Batch Validation
//!
//! Uses Rayon to re-check many stored documents at once, e.g. after the
//! rule table changes. Documents are independent, so each runs on whichever
//! worker is free.

use crate::dimensions::{extract_dimensions, SvgDimensions};
use crate::validator::{verdict, Verdict};
use rayon::prelude::*;

/// Validate every document, preserving input order
pub fn validate_batch<B: AsRef<[u8]> + Sync>(documents: &[B]) -> Vec<Verdict> {
    documents
        .par_iter()
        .map(|doc| verdict(doc.as_ref()))
        .collect()
}

/// Extract dimensions from every document, preserving input order
pub fn extract_dimensions_batch<B: AsRef<[u8]> + Sync>(documents: &[B]) -> Vec<Option<SvgDimensions>> {
    documents
        .par_iter()
        .map(|doc| extract_dimensions(doc.as_ref()))
        .collect()
}
