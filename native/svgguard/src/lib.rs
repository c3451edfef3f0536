//! SvgGuard - untrusted SVG validation
//!
//! Pipeline:
//! 1. Precheck: non-empty, `<svg`/`</svg>` markers, UTF-8
//! 2. Threat rules on raw text, then on entity-decoded text
//! 3. Backslash-escape scan of the decoded text
//! 4. Strict XML parse with DTDs and entity substitution disabled
//!
//! Dimension extraction runs separately on content that already passed.

use rustler::{Binary, Env, NifResult, Term};

mod core;
mod dimensions;
mod dom;
mod error;
mod patterns;
mod reader;
mod strategy;
mod term;
mod validator;

use term::{check_result_to_term, dimensions_list_to_term, dimensions_to_term, str_to_binary, verdicts_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Single Document
// ============================================================================

/// true when the content is safe to store and serve
#[rustler::nif(schedule = "DirtyCpu")]
fn validate(input: Binary) -> bool {
    validator::validate(input.as_slice())
}

/// :ok or {:error, stage, category, rule_id}; for audit logs only
#[rustler::nif(schedule = "DirtyCpu")]
fn check<'a>(env: Env<'a>, input: Binary<'a>) -> NifResult<Term<'a>> {
    let result = validator::check(input.as_slice());
    Ok(check_result_to_term(env, &result))
}

/// {width, height} or nil
#[rustler::nif(schedule = "DirtyCpu")]
fn extract_dimensions<'a>(env: Env<'a>, input: Binary<'a>) -> NifResult<Term<'a>> {
    let dims = dimensions::extract_dimensions(input.as_slice());
    Ok(dimensions_to_term(env, dims))
}

/// Cheap pre-check for upload pipelines
#[rustler::nif]
fn has_svg_markers(input: Binary) -> bool {
    validator::has_svg_markers(input.as_slice())
}

/// Generic message to show whoever uploaded rejected content
#[rustler::nif]
fn rejection_message<'a>(env: Env<'a>) -> NifResult<Term<'a>> {
    Ok(str_to_binary(env, error::Rejection::public_message()))
}

// ============================================================================
// Batches
// ============================================================================

/// Validate many documents in parallel; list of booleans in input order
#[rustler::nif(schedule = "DirtyCpu")]
fn validate_batch<'a>(env: Env<'a>, inputs: Vec<Binary<'a>>) -> NifResult<Term<'a>> {
    let docs: Vec<&[u8]> = inputs.iter().map(|b| b.as_slice()).collect();
    let verdicts = strategy::validate_batch(&docs);
    Ok(verdicts_to_term(env, &verdicts))
}

/// Extract dimensions from many documents in parallel
#[rustler::nif(schedule = "DirtyCpu")]
fn extract_dimensions_batch<'a>(env: Env<'a>, inputs: Vec<Binary<'a>>) -> NifResult<Term<'a>> {
    let docs: Vec<&[u8]> = inputs.iter().map(|b| b.as_slice()).collect();
    let dims = strategy::extract_dimensions_batch(&docs);
    Ok(dimensions_list_to_term(env, &dims))
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.SvgGuard.Native");
