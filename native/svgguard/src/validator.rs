//! SVG Validator
//!
//! Accept/reject decision for untrusted SVG content. Each step is a hard
//! gate and the first failure wins:
//!
//! 1. non-empty
//! 2. `<svg` and `</svg>` present, bytes are UTF-8
//! 3. threat rules against the raw text
//! 4. threat rules against the entity-decoded text
//! 5. no backslash escapes in the decoded text
//! 6. strict XML parse, DTDs and entity substitution disabled

use crate::core::encoding::as_utf8;
use crate::core::entities::decode_entities;
use crate::dom::{ParseOptions, ParsedDocument};
use crate::error::{Rejection, Stage};
use crate::patterns::{Category, PatternLibrary, RuleId};
use log::{debug, warn};
use memchr::memmem;
use std::borrow::Cow;

/// Log target for rejection records
pub const AUDIT_TARGET: &str = "svgguard::audit";

/// Audit record of one validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub accepted: bool,
    pub stage: Option<Stage>,
    pub category: Option<Category>,
    pub rule: Option<RuleId>,
}

impl From<&Result<(), Rejection>> for Verdict {
    fn from(result: &Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => Verdict {
                accepted: true,
                stage: None,
                category: None,
                rule: None,
            },
            Err(rejection) => Verdict {
                accepted: false,
                stage: Some(rejection.stage()),
                category: rejection.category(),
                rule: rejection.rule(),
            },
        }
    }
}

/// Whether `content` is safe to store and serve as an SVG image
pub fn validate(content: &[u8]) -> bool {
    check(content).is_ok()
}

/// Validation outcome as an audit record
pub fn verdict(content: &[u8]) -> Verdict {
    Verdict::from(&check(content))
}

/// Validate `content`, reporting why it was rejected
///
/// Rejections are logged at warn level on [`AUDIT_TARGET`].
pub fn check(content: &[u8]) -> Result<(), Rejection> {
    let result = run_checks(content);
    if let Err(rejection) = &result {
        warn!(
            target: AUDIT_TARGET,
            "svg rejected: stage={} category={} rule={} ({} bytes): {}",
            rejection.stage().as_str(),
            rejection.category().map_or("-", Category::as_str),
            rejection.rule().unwrap_or("-"),
            content.len(),
            rejection
        );
    }
    result
}

/// Both `<svg` and `</svg>` occur, case-sensitively
pub fn has_svg_markers(content: &[u8]) -> bool {
    memmem::find(content, b"<svg").is_some() && memmem::find(content, b"</svg>").is_some()
}

fn run_checks(content: &[u8]) -> Result<(), Rejection> {
    if content.is_empty() {
        return Err(Rejection::EmptyContent);
    }
    if !has_svg_markers(content) {
        return Err(Rejection::MissingSvgRoot);
    }
    let text = as_utf8(content).map_err(|e| Rejection::InvalidEncoding(e.to_string()))?;

    let library = PatternLibrary::global().map_err(|e| Rejection::RulesUnavailable(e.to_string()))?;
    scan(library, text, Stage::RawScan)?;

    let decoded = decode_entities(text);
    if let Cow::Owned(decoded) = &decoded {
        scan(library, decoded, Stage::DecodedScan)?;
    }
    scan_escapes(&decoded)?;

    let doc = ParsedDocument::parse(text, ParseOptions::huge())?;
    debug!("svg accepted ({} bytes, {} elements)", content.len(), doc.element_count());
    Ok(())
}

fn scan(library: &PatternLibrary, text: &str, stage: Stage) -> Result<(), Rejection> {
    match library.first_match(text) {
        Some(rule) => {
            debug!(
                "rule {} matched at {:?} during {}; all matches: {:?}",
                rule.id,
                rule.find(text),
                stage.as_str(),
                library.matches(text).iter().map(|r| r.id).collect::<Vec<_>>()
            );
            Err(Rejection::PatternViolation {
                stage,
                category: rule.category,
                rule: rule.id,
            })
        }
        None => {
            debug!("{} passed", stage.as_str());
            Ok(())
        }
    }
}

fn scan_escapes(decoded: &str) -> Result<(), Rejection> {
    let escapes = PatternLibrary::escapes().map_err(|e| Rejection::RulesUnavailable(e.to_string()))?;
    match escapes.first_match(decoded) {
        Some(rule) => Err(Rejection::ObfuscatedEscapeDetected { rule: rule.id }),
        None => Ok(()),
    }
}
