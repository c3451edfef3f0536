//! Entity and character reference decoding
//!
//! Normalizes text so the second pattern pass sees what an HTML or XML
//! consumer would eventually see. Three passes run in order:
//! 1. named references (XML predefined + HTML5) and in-range numeric references
//! 2. hexadecimal references `&#xHH;`
//! 3. decimal references `&#DD;`
//!
//! Passes 2 and 3 drop references whose codepoint is not a Unicode scalar
//! value. Each pass is a single left-to-right scan, so `&amp;lt;` becomes
//! `&lt;`, never `<`. Custom `<!ENTITY>` declarations are never consulted.
//!
//! Uses Cow for zero-copy when no references are present.

use memchr::memchr;
use std::borrow::Cow;

/// Highest valid Unicode scalar value
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Longest named reference worth looking at (`&CounterClockwiseContourIntegral;` is 31)
///
/// Numeric references have no limit; zero padding is legal.
const MAX_NAME_LEN: usize = 40;

/// A syntactically complete reference, without the `&` and `;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference<'a> {
    Named(&'a str),
    Hex(&'a str),
    Decimal(&'a str),
}

/// What a pass does with one reference
enum Expansion {
    Keep,
    Text(&'static str),
    Char(char),
    Drop,
}

type Pass = fn(Reference<'_>) -> Expansion;

const PASSES: [Pass; 3] = [expand_named, expand_hex, expand_decimal];

/// Decode entity and character references in `input`
///
/// Returns Borrowed if no reference was rewritten.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }

    let mut text = Cow::Borrowed(input);
    for pass in PASSES {
        if let Some(next) = apply_pass(&text, pass) {
            text = Cow::Owned(next);
        }
    }
    text
}

/// Expand only what an XML parser expands: the five predefined entities and
/// character references, in a single pass
pub fn expand_xml_references(input: &str) -> Cow<'_, str> {
    match apply_pass(input, expand_xml) {
        Some(expanded) => Cow::Owned(expanded),
        None => Cow::Borrowed(input),
    }
}

/// Run one pass; None when nothing changed
fn apply_pass(input: &str, pass: Pass) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = memchr(b'&', &bytes[pos..]) {
        let amp = pos + offset;
        let Some((reference, len)) = parse_reference(&input[amp..]) else {
            pos = amp + 1;
            continue;
        };

        let expansion = pass(reference);
        if !matches!(expansion, Expansion::Keep) {
            let buf = out.get_or_insert_with(|| String::with_capacity(input.len()));
            buf.push_str(&input[copied..amp]);
            match expansion {
                Expansion::Text(s) => buf.push_str(s),
                Expansion::Char(c) => buf.push(c),
                Expansion::Drop | Expansion::Keep => {}
            }
            copied = amp + len;
        }
        pos = amp + len;
    }

    out.map(|mut buf| {
        buf.push_str(&input[copied..]);
        buf
    })
}

/// Parse a reference at the start of `s` (which begins with '&')
///
/// Returns the reference and its total length including '&' and ';'.
fn parse_reference(s: &str) -> Option<(Reference<'_>, usize)> {
    let bytes = s.as_bytes();
    let (reference, end) = match bytes.get(1) {
        Some(b'#') => match bytes.get(2) {
            Some(b'x' | b'X') => {
                let end = 3 + run_len(&bytes[3..], u8::is_ascii_hexdigit);
                (Reference::Hex(&s[3..end]), end)
            }
            _ => {
                let end = 2 + run_len(&bytes[2..], u8::is_ascii_digit);
                (Reference::Decimal(&s[2..end]), end)
            }
        },
        _ => {
            let window = &bytes[1..bytes.len().min(MAX_NAME_LEN + 1)];
            let end = 1 + run_len(window, u8::is_ascii_alphanumeric);
            (Reference::Named(&s[1..end]), end)
        }
    };

    let body_empty = match reference {
        Reference::Named(b) | Reference::Hex(b) | Reference::Decimal(b) => b.is_empty(),
    };
    if body_empty || bytes.get(end) != Some(&b';') {
        return None;
    }
    Some((reference, end + 1))
}

#[inline]
fn run_len(bytes: &[u8], accept: fn(&u8) -> bool) -> usize {
    bytes.iter().take_while(|b| accept(*b)).count()
}

/// Value of a character reference's digits, ignoring any zero padding
///
/// None when the digits are empty, not valid in `radix`, or overflow u32.
pub fn parse_codepoint(digits: &str, radix: u32) -> Option<u32> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some(0);
    }
    u32::from_str_radix(significant, radix).ok()
}

fn expand_xml(reference: Reference<'_>) -> Expansion {
    match reference {
        Reference::Named(name @ ("lt" | "gt" | "amp" | "quot" | "apos")) => {
            named_reference(name).map_or(Expansion::Keep, Expansion::Text)
        }
        Reference::Named(_) => Expansion::Keep,
        Reference::Hex(digits) => codepoint_expansion(parse_codepoint(digits, 16)),
        Reference::Decimal(digits) => codepoint_expansion(parse_codepoint(digits, 10)),
    }
}

fn expand_named(reference: Reference<'_>) -> Expansion {
    match reference {
        Reference::Named(name) => match named_reference(name) {
            Some(text) => Expansion::Text(text),
            None => Expansion::Keep,
        },
        // Out-of-range values are left for the numeric passes to drop
        Reference::Hex(digits) => match parse_codepoint(digits, 16).and_then(char::from_u32) {
            Some(c) if c != '\0' => Expansion::Char(c),
            _ => Expansion::Keep,
        },
        Reference::Decimal(digits) => match parse_codepoint(digits, 10).and_then(char::from_u32) {
            Some(c) if c != '\0' => Expansion::Char(c),
            _ => Expansion::Keep,
        },
    }
}

fn expand_hex(reference: Reference<'_>) -> Expansion {
    match reference {
        Reference::Hex(digits) => codepoint_expansion(parse_codepoint(digits, 16)),
        _ => Expansion::Keep,
    }
}

fn expand_decimal(reference: Reference<'_>) -> Expansion {
    match reference {
        Reference::Decimal(digits) => codepoint_expansion(parse_codepoint(digits, 10)),
        _ => Expansion::Keep,
    }
}

/// Overflowing, out-of-range and surrogate codepoints are dropped
fn codepoint_expansion(codepoint: Option<u32>) -> Expansion {
    codepoint
        .filter(|&cp| cp <= MAX_CODEPOINT)
        .and_then(char::from_u32)
        .map_or(Expansion::Drop, Expansion::Char)
}

/// Look up a named character reference (case-sensitive, as in HTML5)
fn named_reference(name: &str) -> Option<&'static str> {
    Some(match name {
        // XML predefined
        "lt" | "LT" => "<",
        "gt" | "GT" => ">",
        "amp" | "AMP" => "&",
        "quot" | "QUOT" => "\"",
        "apos" => "'",
        // Punctuation used to smuggle URL schemes and markup
        "Tab" => "\t",
        "NewLine" => "\n",
        "excl" => "!",
        "num" => "#",
        "dollar" => "$",
        "percnt" => "%",
        "lpar" => "(",
        "rpar" => ")",
        "ast" | "midast" => "*",
        "plus" => "+",
        "comma" => ",",
        "period" => ".",
        "sol" => "/",
        "colon" => ":",
        "semi" => ";",
        "equals" => "=",
        "quest" => "?",
        "commat" => "@",
        "lsqb" | "lbrack" => "[",
        "bsol" => "\\",
        "rsqb" | "rbrack" => "]",
        "Hat" => "^",
        "lowbar" | "UnderBar" => "_",
        "grave" | "DiacriticalGrave" => "`",
        "lcub" | "lbrace" => "{",
        "verbar" | "vert" | "VerticalLine" => "|",
        "rcub" | "rbrace" => "}",
        "hyphen" | "dash" => "\u{2010}",
        "lang" | "langle" => "\u{27E8}",
        "rang" | "rangle" => "\u{27E9}",
        // Whitespace
        "nbsp" | "NonBreakingSpace" => "\u{00A0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200C}",
        "zwj" => "\u{200D}",
        "ZeroWidthSpace" => "\u{200B}",
        // Typography
        "copy" | "COPY" => "\u{00A9}",
        "reg" | "REG" => "\u{00AE}",
        "trade" | "TRADE" => "\u{2122}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "laquo" => "\u{00AB}",
        "raquo" => "\u{00BB}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00B7}",
        "deg" => "\u{00B0}",
        "plusmn" => "\u{00B1}",
        "times" => "\u{00D7}",
        "divide" => "\u{00F7}",
        "micro" => "\u{00B5}",
        "para" => "\u{00B6}",
        "sect" => "\u{00A7}",
        "euro" => "\u{20AC}",
        "pound" => "\u{00A3}",
        "yen" => "\u{00A5}",
        "cent" => "\u{00A2}",
        _ => return None,
    })
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::check_references;
    use proptest::prelude::*;

    #[test]
    fn test_no_entities() {
        let result = decode_entities("Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_unknown_entity_is_borrowed() {
        let result = decode_entities("&unknown; & plain");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "&unknown; & plain");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_entities("&lt;hello&gt; &amp; &quot;world&quot;");
        assert_eq!(result, "<hello> & \"world\"");
    }

    #[test]
    fn test_script_markup_revealed() {
        assert_eq!(
            decode_entities("&lt;script&gt;alert(1)&lt;/script&gt;"),
            "<script>alert(1)</script>"
        );
    }

    #[test]
    fn test_numeric_decimal() {
        assert_eq!(decode_entities("&#106;&#97;&#118;&#97;"), "java");
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(decode_entities("j&#x61;v&#X61;s&#x63;ript"), "javascript");
    }

    #[test]
    fn test_html5_punctuation() {
        assert_eq!(decode_entities("javascript&colon;alert&lpar;1&rpar;"), "javascript:alert(1)");
        assert_eq!(decode_entities("java&Tab;script"), "java\tscript");
    }

    #[test]
    fn test_unicode_entity() {
        assert_eq!(decode_entities("&#x1F600;"), "😀");
    }

    #[test]
    fn test_out_of_range_dropped() {
        assert_eq!(decode_entities("a&#x110000;b"), "ab");
        assert_eq!(decode_entities("a&#1114112;b"), "ab");
        assert_eq!(decode_entities("a&#xFFFFFFFFFF;b"), "ab");
    }

    #[test]
    fn test_zero_padded_references_decoded() {
        let zeros = "0".repeat(38);
        assert_eq!(decode_entities(&format!("&#{zeros}106;avascript:")), "javascript:");
        assert_eq!(decode_entities(&format!("&#x{zeros}6A;avascript:")), "javascript:");
        assert_eq!(decode_entities(&format!("&#{};", "0".repeat(4096))), "\0");
        assert_eq!(expand_xml_references(&format!("&#{zeros}60;")), "<");
    }

    #[test]
    fn test_long_overflowing_reference_dropped() {
        assert_eq!(decode_entities(&format!("a&#{};b", "9".repeat(64))), "ab");
    }

    #[test]
    fn test_overlong_name_not_a_reference() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        let text = format!("&{name};");
        assert!(matches!(decode_entities(&text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_parse_codepoint() {
        assert_eq!(parse_codepoint("0000106", 10), Some(106));
        assert_eq!(parse_codepoint("000", 10), Some(0));
        assert_eq!(parse_codepoint("6a", 16), Some(0x6A));
        assert_eq!(parse_codepoint("6a", 10), None);
        assert_eq!(parse_codepoint("+5", 10), None);
        assert_eq!(parse_codepoint("", 16), None);
        assert_eq!(parse_codepoint("4294967296", 10), None);
    }

    #[test]
    fn test_surrogate_dropped() {
        assert_eq!(decode_entities("a&#xD800;b"), "ab");
    }

    #[test]
    fn test_single_level_per_pass() {
        // Named pass runs once: &amp;lt; yields &lt; and stays there
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        // The numeric passes run after the named pass
        assert_eq!(decode_entities("&amp;#60;"), "<");
    }

    #[test]
    fn test_missing_semicolon_kept() {
        assert_eq!(decode_entities("&lt &#60"), "&lt &#60");
    }

    #[test]
    fn test_multibyte_text_preserved() {
        assert_eq!(decode_entities("héllo &amp; wörld"), "héllo & wörld");
    }

    #[test]
    fn test_xml_expansion_is_single_level() {
        assert_eq!(expand_xml_references("&amp;#60;&#x41;"), "&#60;A");
        assert_eq!(expand_xml_references("&colon;"), "&colon;");
        assert!(matches!(expand_xml_references("100"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_valid_xml_char() {
        assert!(is_valid_xml_char(0x9));
        assert!(is_valid_xml_char(0x41));
        assert!(!is_valid_xml_char(0x0));
        assert!(!is_valid_xml_char(0xFFFE));
        assert!(!is_valid_xml_char(0x110000));
    }

    proptest! {
        #[test]
        fn prop_decode_is_total(input in "[a-z&#;x0-9 ]{0,80}") {
            let _ = decode_entities(&input);
            let _ = expand_xml_references(&input);
        }

        #[test]
        fn prop_decodes_every_reference_the_parser_accepts(
            padding in 0usize..120,
            codepoint in prop_oneof![
                Just(0x9u32),
                0x20u32..0xD800,
                0xE000u32..0xFFFE,
                0x10000u32..0x110000,
            ],
            hex in any::<bool>(),
        ) {
            let zeros = "0".repeat(padding);
            let reference = if hex {
                format!("&#x{zeros}{codepoint:x};")
            } else {
                format!("&#{zeros}{codepoint};")
            };
            prop_assert!(check_references(reference.as_bytes()).is_ok());

            let expected = char::from_u32(codepoint).map(String::from);
            prop_assert_eq!(Some(decode_entities(&reference).into_owned()), expected.clone());
            prop_assert_eq!(Some(expand_xml_references(&reference).into_owned()), expected);
        }

        #[test]
        fn prop_plain_text_borrowed(input in "[^&]{0,80}") {
            prop_assert!(matches!(decode_entities(&input), Cow::Borrowed(s) if s == input));
        }
    }
}
