//! XML Attribute Parsing
//!
//! Parses the attribute region of a start tag (or XML declaration) in strict
//! mode. Values stay raw: references are checked, not substituted.

use super::entities::expand_xml_references;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use super::tokenizer::check_references;
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute borrowed from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a [u8],
    /// Raw attribute value, references left in place
    pub value: &'a [u8],
    /// Local name (after colon, if namespaced)
    pub local_name: &'a [u8],
    /// Namespace prefix (before colon), if any
    pub prefix: Option<&'a [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: &'a [u8]) -> Self {
        let (prefix, local_name) = split_name(name);
        Attribute {
            name,
            value,
            local_name,
            prefix,
        }
    }

    pub fn name_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.value).ok()
    }

    /// Value with character references and predefined entities expanded
    pub fn decoded_value(&self) -> Option<Cow<'a, str>> {
        self.value_str().map(expand_xml_references)
    }
}

/// Split a name into prefix and local name at the colon
pub fn split_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match memchr(b':', name) {
        Some(colon) => (Some(&name[..colon]), &name[colon + 1..]),
        None => (None, name),
    }
}

/// Parse attributes from the content between the element name and '>' or '/>'
///
/// On failure returns the message and the offset within `input`.
pub fn parse_attributes(input: &[u8]) -> Result<Vec<Attribute<'_>>, (&'static str, usize)> {
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }
        if pos == ws_start {
            return Err(("Whitespace required between attributes", pos));
        }

        if !is_name_start_char(input[pos]) {
            return Err(("Attribute name must start with letter, underscore, or colon", pos));
        }
        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if input.get(pos) != Some(&b'=') {
            return Err(("Attribute value required", pos));
        }
        pos += 1;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        let quote = match input.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err(("Attribute value must be quoted", pos)),
        };
        pos += 1;
        let value_start = pos;
        let value_end = memchr(quote, &input[value_start..])
            .map(|i| value_start + i)
            .ok_or(("Attribute value has mismatched quotes", value_start))?;
        let value = &input[value_start..value_end];

        if let Some(i) = memchr(b'<', value) {
            return Err(("Attribute value cannot contain '<'", value_start + i));
        }
        check_references(value).map_err(|(msg, i)| (msg, value_start + i))?;

        attrs.push(Attribute::new(name, value));
        pos = value_end + 1;
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" id=\"test\" class=\"foo\"").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name_str(), Some("id"));
        assert_eq!(attrs[0].value_str(), Some("test"));
        assert_eq!(attrs[1].name_str(), Some("class"));
        assert_eq!(attrs[1].value_str(), Some("foo"));
    }

    #[test]
    fn test_single_quoted() {
        let attrs = parse_attributes(b" id='te\"st'").unwrap();
        assert_eq!(attrs[0].value_str(), Some("te\"st"));
    }

    #[test]
    fn test_namespaced_attribute() {
        let attrs = parse_attributes(b" xmlns:xlink=\"http://www.w3.org/1999/xlink\"").unwrap();
        assert_eq!(attrs[0].prefix, Some(b"xmlns" as &[u8]));
        assert_eq!(attrs[0].local_name, b"xlink");
    }

    #[test]
    fn test_value_kept_raw() {
        let attrs = parse_attributes(b" title=\"&lt;hello&gt;\"").unwrap();
        assert_eq!(attrs[0].value_str(), Some("&lt;hello&gt;"));
        assert_eq!(attrs[0].decoded_value().as_deref(), Some("<hello>"));
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes(b"  id  =  \"test\"  ").unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value_str(), Some("test"));
    }

    #[test]
    fn test_empty_region() {
        assert!(parse_attributes(b"").unwrap().is_empty());
        assert!(parse_attributes(b"   ").unwrap().is_empty());
    }

    #[test]
    fn test_strict_failures() {
        assert!(parse_attributes(b" checked").is_err());
        assert!(parse_attributes(b" width=100").is_err());
        assert!(parse_attributes(b" a=\"1\"b=\"2\"").is_err());
        assert!(parse_attributes(b" a=\"x<y\"").is_err());
        assert!(parse_attributes(b" a=\"open").is_err());
        assert!(parse_attributes(b" a=\"&custom;\"").is_err());
        assert!(parse_attributes(b" -a=\"1\"").is_err());
    }
}
