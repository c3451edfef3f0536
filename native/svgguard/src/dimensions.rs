//! Intrinsic size of an accepted SVG
//!
//! `width`/`height` on the root element win when both yield a positive
//! integer; otherwise the `viewBox` extent is used. Units are ignored.

use crate::core::encoding::as_utf8;
use crate::dom::{ParseOptions, ParsedDocument};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SvgDimensions {
    pub width: u32,
    pub height: u32,
}

impl SvgDimensions {
    fn positive(width: i64, height: i64) -> Option<Self> {
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(SvgDimensions {
            width: u32::try_from(width).ok()?,
            height: u32::try_from(height).ok()?,
        })
    }
}

/// Width and height of the root `<svg>`, if it asserts one
///
/// Content that fails to parse yields `None`.
pub fn extract_dimensions(content: &[u8]) -> Option<SvgDimensions> {
    let text = as_utf8(content).ok()?;
    let doc = match ParsedDocument::parse(text, ParseOptions::huge()) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("no dimensions, parse failed: {}", e);
            return None;
        }
    };
    if doc.root_name() != "svg" {
        return None;
    }

    from_width_height(&doc).or_else(|| from_view_box(&doc))
}

fn from_width_height(doc: &ParsedDocument) -> Option<SvgDimensions> {
    let width = doc.root_attribute("width").filter(|w| !w.is_empty())?;
    let height = doc.root_attribute("height").filter(|h| !h.is_empty())?;
    SvgDimensions::positive(stripped_integer(width), stripped_integer(height))
}

fn from_view_box(doc: &ParsedDocument) -> Option<SvgDimensions> {
    let view_box = doc.root_attribute("viewBox")?;
    let mut parts = view_box
        .split(|c: char| c.is_ascii_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .skip(2);
    let width = leading_integer(parts.next()?);
    let height = leading_integer(parts.next()?);
    SvgDimensions::positive(width, height)
}

/// Integer part of `value` after dropping everything but digits and '.'
///
/// `"12.7px"` gives 12, `"-5"` gives 5.
fn stripped_integer(value: &str) -> i64 {
    let kept: String = value.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    leading_integer(&kept)
}

/// Leading optionally-signed integer of `value`, truncating any fraction
///
/// Non-numeric input gives 0; overflow saturates.
fn leading_integer(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
