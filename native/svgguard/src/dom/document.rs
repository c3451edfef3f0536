//! Parsed Document
//!
//! Strict, non-recovering well-formedness pass over untrusted markup. The
//! event loop keeps an explicit tag stack, so nesting depth costs heap, not
//! call stack. Nothing external is ever fetched: DOCTYPE declarations are
//! refused outright and entity substitution never happens.
//!
//! Only a summary of the root element is retained.

use super::namespace::NamespaceScope;
use crate::core::encoding::is_supported_declared_encoding;
use crate::core::entities::is_valid_xml_char;
use crate::core::scanner::is_whitespace;
use crate::core::tokenizer::ParseError;
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;

/// Resource limits applied while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest element nesting allowed
    pub max_depth: Option<usize>,
    /// Longest single text or CDATA node allowed, in bytes
    pub max_text_len: Option<usize>,
}

impl ParseOptions {
    /// No depth or text-size limits
    pub fn huge() -> Self {
        ParseOptions {
            max_depth: None,
            max_text_len: None,
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_depth: Some(256),
            max_text_len: Some(10_000_000),
        }
    }
}

/// Root element of a well-formed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    root_name: String,
    /// Root attributes with references expanded
    root_attributes: Vec<(String, String)>,
    element_count: usize,
}

impl ParsedDocument {
    /// Parse `input` strictly; the first well-formedness violation is returned
    pub fn parse(input: &str, options: ParseOptions) -> Result<Self, ParseError> {
        check_characters(input)?;
        DocumentBuilder::new(options).run(input.as_bytes())
    }

    /// Qualified name of the root element, prefix included
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Value of a root attribute by qualified name
    pub fn root_attribute(&self, name: &str) -> Option<&str> {
        self.root_attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }
}

/// Reject characters outside the XML 1.0 `Char` production
fn check_characters(input: &str) -> Result<(), ParseError> {
    match input.char_indices().find(|&(_, c)| !is_valid_xml_char(c as u32)) {
        Some((i, _)) => Err(ParseError::new("Character not allowed in XML", i)),
        None => Ok(()),
    }
}

struct DocumentBuilder<'a> {
    options: ParseOptions,
    tag_stack: Vec<&'a [u8]>,
    namespaces: NamespaceScope<'a>,
    root: Option<ParsedDocument>,
    seen_root_element: bool,
    element_count: usize,
}

impl<'a> DocumentBuilder<'a> {
    fn new(options: ParseOptions) -> Self {
        DocumentBuilder {
            options,
            tag_stack: Vec::new(),
            namespaces: NamespaceScope::new(),
            root: None,
            seen_root_element: false,
            element_count: 0,
        }
    }

    fn run(mut self, input: &'a [u8]) -> Result<ParsedDocument, ParseError> {
        let mut reader = SliceReader::new(input);

        loop {
            match reader.next_event()? {
                XmlEvent::StartElement(elem) => {
                    self.open_element(&elem)?;
                    self.tag_stack.push(elem.name);
                }

                XmlEvent::EmptyElement(elem) => {
                    self.open_element(&elem)?;
                    self.namespaces.pop_scope();
                }

                XmlEvent::EndElement(end) => {
                    match self.tag_stack.pop() {
                        Some(start) if start == end.name => {}
                        Some(start) => {
                            return Err(ParseError::new(
                                format!(
                                    "Tag mismatch: <{}> closed with </{}>",
                                    String::from_utf8_lossy(start),
                                    String::from_utf8_lossy(end.name)
                                ),
                                end.position,
                            ));
                        }
                        None => {
                            return Err(ParseError::new(
                                format!(
                                    "Unexpected end tag: </{}> without matching start tag",
                                    String::from_utf8_lossy(end.name)
                                ),
                                end.position,
                            ));
                        }
                    }
                    self.namespaces.pop_scope();
                }

                XmlEvent::Text(content) => {
                    if self.tag_stack.is_empty() && !content.iter().all(|&b| is_whitespace(b)) {
                        return Err(ParseError::new("Text content not allowed at document level", offset_in(input, content)));
                    }
                    self.check_text_len(content, input)?;
                }

                XmlEvent::CData(content) => {
                    if self.tag_stack.is_empty() {
                        return Err(ParseError::new("CDATA section not allowed at document level", offset_in(input, content)));
                    }
                    self.check_text_len(content, input)?;
                }

                XmlEvent::Comment | XmlEvent::ProcessingInstruction => {}

                XmlEvent::DocType(content) => {
                    return Err(ParseError::new(
                        "DOCTYPE is not allowed: DTD processing is disabled",
                        offset_in(input, content),
                    ));
                }

                XmlEvent::XmlDeclaration { version, encoding } => {
                    if version.is_none() {
                        return Err(ParseError::new("XML declaration requires a version", 0));
                    }
                    if let Some(label) = encoding {
                        if !is_supported_declared_encoding(label) {
                            return Err(ParseError::new(
                                format!("Unsupported declared encoding: {}", String::from_utf8_lossy(label)),
                                0,
                            ));
                        }
                    }
                }

                XmlEvent::EndDocument => break,
            }
        }

        if let Some(unclosed) = self.tag_stack.first() {
            return Err(ParseError::new(
                format!("Unclosed tag: <{}>", String::from_utf8_lossy(unclosed)),
                input.len(),
            ));
        }

        let mut root = self
            .root
            .ok_or_else(|| ParseError::new("Document has no root element", input.len()))?;
        root.element_count = self.element_count;
        Ok(root)
    }

    fn open_element(&mut self, elem: &StartElement<'a>) -> Result<(), ParseError> {
        if self.tag_stack.is_empty() {
            if self.seen_root_element {
                return Err(ParseError::new("Extra content at the end of the document", elem.position));
            }
            self.seen_root_element = true;
        }

        if let Some(max) = self.options.max_depth {
            if self.tag_stack.len() >= max {
                return Err(ParseError::new(
                    format!("Excessive depth in document: {} exceeds limit", self.tag_stack.len() + 1),
                    elem.position,
                ));
            }
        }

        if let Some(dup) = elem.duplicate_attribute() {
            return Err(ParseError::new(
                format!("Attribute {} redefined", String::from_utf8_lossy(dup)),
                elem.position,
            ));
        }

        self.namespaces.push_scope();
        for attr in &elem.attributes {
            if attr.prefix == Some(b"xmlns".as_slice()) {
                if attr.value.is_empty() {
                    return Err(ParseError::new("Empty namespace URI for a prefix", elem.position));
                }
                self.namespaces.declare(attr.local_name, attr.value);
            }
        }
        if let Some(prefix) = elem.prefix {
            self.require_prefix(prefix, elem.position)?;
        }
        for attr in &elem.attributes {
            if let Some(prefix) = attr.prefix {
                self.require_prefix(prefix, elem.position)?;
            }
        }

        self.element_count += 1;
        if self.root.is_none() {
            self.root = Some(root_of(elem));
        }
        Ok(())
    }

    fn require_prefix(&self, prefix: &[u8], position: usize) -> Result<(), ParseError> {
        if self.namespaces.is_declared(prefix) {
            Ok(())
        } else {
            Err(ParseError::new(
                format!("Namespace prefix {} is not defined", String::from_utf8_lossy(prefix)),
                position,
            ))
        }
    }

    fn check_text_len(&self, content: &[u8], input: &[u8]) -> Result<(), ParseError> {
        match self.options.max_text_len {
            Some(max) if content.len() > max => Err(ParseError::new(
                "Text node exceeds size limit",
                offset_in(input, content),
            )),
            _ => Ok(()),
        }
    }
}

fn root_of(elem: &StartElement<'_>) -> ParsedDocument {
    let root_attributes = elem
        .attributes
        .iter()
        .filter_map(|attr| Some((attr.name_str()?.to_string(), attr.decoded_value()?.into_owned())))
        .collect();

    ParsedDocument {
        root_name: String::from_utf8_lossy(elem.name).into_owned(),
        root_attributes,
        element_count: 0,
    }
}

/// Byte offset of a sub-slice within the input
fn offset_in(input: &[u8], part: &[u8]) -> usize {
    (part.as_ptr() as usize).saturating_sub(input.as_ptr() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<ParsedDocument, ParseError> {
        ParsedDocument::parse(input, ParseOptions::default())
    }

    #[test]
    fn test_parse_simple() {
        let doc = parse("<svg width=\"10\"><rect/><g><circle/></g></svg>").unwrap();
        assert_eq!(doc.root_name(), "svg");
        assert_eq!(doc.root_attribute("width"), Some("10"));
        assert_eq!(doc.element_count(), 4);
    }

    #[test]
    fn test_prolog_and_trailing_misc() {
        let doc = parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- hi -->\n<svg/>\n<!-- bye -->\n").unwrap();
        assert_eq!(doc.root_name(), "svg");
    }

    #[test]
    fn test_root_attribute_references_expanded() {
        let doc = parse("<svg width=\"&#49;0\" title=\"a &amp; b\"/>").unwrap();
        assert_eq!(doc.root_attribute("width"), Some("10"));
        assert_eq!(doc.root_attribute("title"), Some("a & b"));
    }

    #[test]
    fn test_doctype_refused() {
        let err = parse("<!DOCTYPE svg><svg/>").unwrap_err();
        assert!(err.message.contains("DOCTYPE"));
        assert!(parse("<!DOCTYPE svg [<!ENTITY lol \"lol\">]><svg>&lol;</svg>").is_err());
    }

    #[test]
    fn test_mismatched_tags() {
        let err = parse("<svg><g></svg>").unwrap_err();
        assert!(err.message.contains("Tag mismatch"));
        assert!(parse("<svg></g>").is_err());
        assert!(parse("<svg><g>").is_err());
    }

    #[test]
    fn test_single_root() {
        assert!(parse("<svg/><svg/>").is_err());
        assert!(parse("<svg></svg>junk").is_err());
        assert!(parse("junk<svg/>").is_err());
        assert!(parse("<!-- only a comment -->").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_cdata_outside_root() {
        assert!(parse("<svg/><![CDATA[x]]>").is_err());
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = parse("<svg a=\"1\" a=\"2\"/>").unwrap_err();
        assert!(err.message.contains("redefined"));
    }

    #[test]
    fn test_namespace_prefixes() {
        assert!(parse("<svg xmlns:xlink=\"http://www.w3.org/1999/xlink\"><use xlink:href=\"#a\"/></svg>").is_ok());
        assert!(parse("<svg xml:lang=\"en\"/>").is_ok());
        assert!(parse("<svg:svg><svg:script/></svg:svg>").is_err());
        assert!(parse("<svg><use xlink:href=\"#a\"/></svg>").is_err());
        assert!(parse("<svg><g xmlns:a=\"urn:a\"/><a:x/></svg>").is_err());
    }

    #[test]
    fn test_declared_encoding() {
        assert!(parse("<?xml version=\"1.0\" encoding=\"utf-7\"?><svg/>").is_err());
        assert!(parse("<?xml version=\"1.0\" encoding=\"us-ascii\"?><svg/>").is_ok());
        assert!(parse("<?xml encoding=\"utf-8\"?><svg/>").is_err());
    }

    #[test]
    fn test_control_characters_refused() {
        let err = parse("<svg>\u{1}</svg>").unwrap_err();
        assert_eq!(err.position, 5);
        assert!(parse("<svg>\t\r\n</svg>").is_ok());
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}{}", "<g>".repeat(300), "</g>".repeat(300));
        let err = parse(&deep).unwrap_err();
        assert!(err.message.contains("depth"));
        assert!(ParsedDocument::parse(&deep, ParseOptions::huge()).is_ok());
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let deep = format!("{}{}", "<g>".repeat(100_000), "</g>".repeat(100_000));
        let doc = ParsedDocument::parse(&deep, ParseOptions::huge()).unwrap();
        assert_eq!(doc.element_count(), 100_000);
    }

    #[test]
    fn test_text_limit() {
        let options = ParseOptions {
            max_text_len: Some(4),
            ..ParseOptions::default()
        };
        assert!(ParsedDocument::parse("<svg>12345</svg>", options).is_err());
        assert!(ParsedDocument::parse("<svg>1234</svg>", options).is_ok());
    }

    #[test]
    fn test_error_position() {
        let err = parse("<svg>\n  <g></svg>").unwrap_err();
        assert_eq!(err.position, 11);
    }
}
