//! Rejection taxonomy
//!
//! Every way untrusted content can fail validation. These are expected
//! outcomes, reported as values; none of them is a bug.

use crate::core::tokenizer::ParseError;
use crate::patterns::{Category, RuleId};
use thiserror::Error;

/// The only message shown to whoever uploaded the content
const PUBLIC_REJECTION_MESSAGE: &str =
    "SVG file contains dangerous content and was rejected for security reasons.";

/// Validation step at which content was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Emptiness, SVG markers and byte encoding
    Precheck,
    RawScan,
    DecodedScan,
    /// Backslash escapes surviving entity decoding
    EscapeScan,
    StructuralCheck,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Precheck => "precheck",
            Stage::RawScan => "raw_scan",
            Stage::DecodedScan => "decoded_scan",
            Stage::EscapeScan => "escape_scan",
            Stage::StructuralCheck => "structural_check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("content is empty")]
    EmptyContent,

    #[error("content lacks <svg and </svg> markers")]
    MissingSvgRoot,

    #[error("content is not UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("rule {rule} ({}) matched during {}", category.as_str(), stage.as_str())]
    PatternViolation {
        stage: Stage,
        category: Category,
        rule: RuleId,
    },

    #[error("backslash escape {rule} survived entity decoding")]
    ObfuscatedEscapeDetected { rule: RuleId },

    #[error("structural check failed: {0}")]
    StructuralParseFailure(#[from] ParseError),

    /// Detector table failed to compile; nothing can be accepted
    #[error("threat rules unavailable: {0}")]
    RulesUnavailable(String),
}

impl Rejection {
    pub fn stage(&self) -> Stage {
        match self {
            Rejection::EmptyContent
            | Rejection::MissingSvgRoot
            | Rejection::InvalidEncoding(_)
            | Rejection::RulesUnavailable(_) => Stage::Precheck,
            Rejection::PatternViolation { stage, .. } => *stage,
            Rejection::ObfuscatedEscapeDetected { .. } => Stage::EscapeScan,
            Rejection::StructuralParseFailure(_) => Stage::StructuralCheck,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            Rejection::PatternViolation { category, .. } => Some(*category),
            Rejection::ObfuscatedEscapeDetected { .. } => Some(Category::ObfuscationEncoding),
            _ => None,
        }
    }

    pub fn rule(&self) -> Option<RuleId> {
        match self {
            Rejection::PatternViolation { rule, .. } | Rejection::ObfuscatedEscapeDetected { rule } => Some(*rule),
            _ => None,
        }
    }

    /// Caller-facing text; the same for every rejection so it never
    /// reveals which check fired
    pub fn public_message() -> &'static str {
        PUBLIC_REJECTION_MESSAGE
    }
}
