//! Zero-Copy Slice Reader
//!
//! Turns strict tokens into events borrowed from the input slice.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::tokenizer::{ParseError, Token, TokenKind, Tokenizer};

/// Zero-copy strict XML reader from a byte slice
pub struct SliceReader<'a> {
    tokenizer: Tokenizer<'a>,
    finished: bool,
}

impl<'a> SliceReader<'a> {
    /// Reader positioned at the start of `input`
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            tokenizer: Tokenizer::new(input),
            finished: false,
        }
    }

    /// Get the next XML event; `EndDocument` marks the end of input
    pub fn next_event(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        if self.finished {
            return Ok(XmlEvent::EndDocument);
        }

        let token = self.tokenizer.next_token()?;
        let position = token.span.0;

        let event = match token.kind {
            TokenKind::Eof => {
                self.finished = true;
                XmlEvent::EndDocument
            }
            TokenKind::StartTag => XmlEvent::StartElement(Self::start_element(&token)?),
            TokenKind::EmptyTag => XmlEvent::EmptyElement(Self::start_element(&token)?),
            TokenKind::EndTag => XmlEvent::EndElement(EndElement::new(token.name.unwrap_or_default(), position)),
            TokenKind::Text => XmlEvent::Text(token.content.unwrap_or_default()),
            TokenKind::CData => XmlEvent::CData(token.content.unwrap_or_default()),
            TokenKind::Comment => XmlEvent::Comment,
            TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction,
            TokenKind::XmlDeclaration => {
                // Declaration pseudo-attributes follow "<?xml"
                let attrs = parse_attributes(token.attrs.unwrap_or_default())
                    .map_err(|(msg, i)| ParseError::new(msg, position + 5 + i))?;
                let find = |name: &[u8]| attrs.iter().find(|a| a.name == name).map(|a| a.value);
                XmlEvent::XmlDeclaration {
                    version: find(b"version"),
                    encoding: find(b"encoding"),
                }
            }
            TokenKind::DocType => XmlEvent::DocType(token.content.unwrap_or_default()),
        };

        Ok(event)
    }

    /// Build a start element, mapping attribute errors to document offsets
    fn start_element(token: &Token<'a>) -> Result<StartElement<'a>, ParseError> {
        let position = token.span.0;
        let name = token.name.unwrap_or_default();
        // Attribute offsets are relative to the region after '<' + name
        let region_offset = position + 1 + name.len();
        let attrs = parse_attributes(token.attrs.unwrap_or_default())
            .map_err(|(msg, i)| ParseError::new(msg, region_offset + i))?;
        Ok(StartElement::new(name, attrs, position))
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(XmlEvent::EndDocument) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
            other => Some(other),
        }
    }
}
