//! Strict XML Tokenizer
//!
//! Pull tokenizer over UTF-8 input. It never recovers: the first
//! well-formedness violation is returned as a [`ParseError`] and the
//! tokenizer stops. It never substitutes entities either. References are
//! checked (predefined names and valid character references only) but the
//! text spans it hands out are the raw bytes.
//!
//! DOCTYPE declarations are tokenized only far enough to be reported; the
//! internal subset is never interpreted.

use super::entities::{is_valid_xml_char, parse_codepoint};
use super::scanner::{is_name_char, is_whitespace, Scanner};
use memchr::{memchr, memmem};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    DocType,
    Eof,
}

/// A token borrowed from the input
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// Element name or PI target
    pub name: Option<&'a [u8]>,
    /// Text, CDATA, comment or PI body
    pub content: Option<&'a [u8]>,
    /// Raw attribute region of a tag or XML declaration
    pub attrs: Option<&'a [u8]>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
            attrs: None,
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: &'a [u8]) -> Self {
        self.content = Some(content);
        self
    }

    fn with_attrs(mut self, attrs: &'a [u8]) -> Self {
        self.attrs = Some(attrs);
        self
    }
}

/// A well-formedness violation and the byte offset where it was found
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// Strict pull tokenizer
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            done: false,
        }
    }

    /// Get the next token; `Eof` once, then `Eof` forever
    pub fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        if self.done || self.scanner.is_eof() {
            self.done = true;
            return Ok(Token::new(TokenKind::Eof, (start, start)));
        }

        if self.scanner.peek() != Some(b'<') {
            return self.read_text(start);
        }

        if self.scanner.starts_with(b"<!--") {
            self.read_comment(start)
        } else if self.scanner.starts_with(b"<![CDATA[") {
            self.read_cdata(start)
        } else if self.scanner.starts_with(b"<!DOCTYPE") {
            self.read_doctype(start)
        } else if self.scanner.starts_with(b"<!") {
            Err(ParseError::new("Unsupported markup declaration", start))
        } else if self.scanner.starts_with(b"<?") {
            self.read_processing_instruction(start)
        } else if self.scanner.starts_with(b"</") {
            self.read_end_tag(start)
        } else {
            self.read_start_tag(start)
        }
    }

    fn read_text(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let end = self
            .scanner
            .find_byte(b'<')
            .unwrap_or(start + self.scanner.remaining().len());
        let content = self.scanner.slice(start, end);

        if let Some(i) = memmem::find(content, b"]]>") {
            return Err(ParseError::new("Sequence ']]>' not allowed in content", start + i));
        }
        check_references(content).map_err(|(msg, i)| ParseError::new(msg, start + i))?;

        self.scanner.set_position(end);
        Ok(Token::new(TokenKind::Text, (start, end)).with_content(content))
    }

    fn read_comment(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(4);
        let body_start = self.scanner.position();
        let end = self
            .scanner
            .find_seq(b"-->")
            .ok_or_else(|| ParseError::new("Unterminated comment", start))?;
        let content = self.scanner.slice(body_start, end);

        if memmem::find(content, b"--").is_some() || content.ends_with(b"-") {
            return Err(ParseError::new("'--' not allowed in comment", start));
        }

        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::Comment, (start, end + 3)).with_content(content))
    }

    fn read_cdata(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(9);
        let body_start = self.scanner.position();
        let end = self
            .scanner
            .find_seq(b"]]>")
            .ok_or_else(|| ParseError::new("Unterminated CDATA section", start))?;
        let content = self.scanner.slice(body_start, end);

        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::CData, (start, end + 3)).with_content(content))
    }

    fn read_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(9);
        // Skip an internal subset without interpreting it
        let subset_end = match (self.scanner.find_byte(b'['), self.scanner.find_tag_end_quoted()) {
            (Some(open), Some(close)) if open < close => {
                self.scanner.set_position(open);
                self.scanner.find_byte(b']')
            }
            _ => Some(self.scanner.position()),
        };
        let end = subset_end
            .and_then(|p| {
                self.scanner.set_position(p);
                self.scanner.find_byte(b'>')
            })
            .ok_or_else(|| ParseError::new("Unterminated DOCTYPE declaration", start))?;

        self.scanner.set_position(end + 1);
        let content = self.scanner.slice(start, end + 1);
        Ok(Token::new(TokenKind::DocType, (start, end + 1)).with_content(content))
    }

    fn read_processing_instruction(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2);
        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Processing instruction target expected", start))?;
        let end = self
            .scanner
            .find_seq(b"?>")
            .ok_or_else(|| ParseError::new("Unterminated processing instruction", start))?;
        let body = self.scanner.slice(self.scanner.position(), end);
        self.scanner.set_position(end + 2);

        if !body.is_empty() && !is_whitespace(body[0]) {
            return Err(ParseError::new("Whitespace required after processing instruction target", start));
        }

        if target.eq_ignore_ascii_case(b"xml") {
            if target != b"xml" || start != 0 {
                return Err(ParseError::new("XML declaration allowed only at the start of the document", start));
            }
            return Ok(Token::new(TokenKind::XmlDeclaration, (start, end + 2)).with_attrs(body));
        }

        let content = trim_start(body);
        Ok(Token::new(TokenKind::ProcessingInstruction, (start, end + 2))
            .with_name(target)
            .with_content(content))
    }

    fn read_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Invalid end tag name", start))?;
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(ParseError::new("Expected '>' to close end tag", self.scanner.position()));
        }
        self.scanner.advance(1);
        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    fn read_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Invalid element name", start))?;
        let attrs_start = self.scanner.position();
        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| ParseError::new("Unterminated start tag", start))?;

        let (kind, attrs_end) = if end > attrs_start && self.scanner.slice(end - 1, end) == b"/" {
            (TokenKind::EmptyTag, end - 1)
        } else {
            (TokenKind::StartTag, end)
        };
        let attrs = self.scanner.slice(attrs_start, attrs_end);

        self.scanner.set_position(end + 1);
        Ok(Token::new(kind, (start, end + 1)).with_name(name).with_attrs(attrs))
    }
}

/// Check every '&' in `content` starts a predefined entity or valid character reference
///
/// On failure returns the message and the offset of the offending '&'.
pub fn check_references(content: &[u8]) -> Result<(), (&'static str, usize)> {
    let mut pos = 0;
    while let Some(offset) = memchr(b'&', &content[pos..]) {
        let amp = pos + offset;
        let semi = memchr(b';', &content[amp..])
            .map(|i| amp + i)
            .ok_or(("Bare '&' not allowed; use &amp;", amp))?;
        let body = &content[amp + 1..semi];

        if let Some(num) = body.strip_prefix(b"#") {
            let codepoint = parse_char_ref(num).ok_or(("Invalid character reference", amp))?;
            if !is_valid_xml_char(codepoint) {
                return Err(("Character reference to invalid XML character", amp));
            }
        } else if body.is_empty() || !body.iter().all(|&b| is_name_char(b)) {
            return Err(("Bare '&' not allowed; use &amp;", amp));
        } else if !matches!(body, b"lt" | b"gt" | b"amp" | b"quot" | b"apos") {
            return Err(("Undefined entity reference; entity substitution is disabled", amp));
        }
        pos = semi + 1;
    }
    Ok(())
}

fn parse_char_ref(num: &[u8]) -> Option<u32> {
    let (digits, radix) = match num.strip_prefix(b"x") {
        Some(hex) => (hex, 16),
        None => (num, 10),
    };
    if !digits.iter().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    parse_codepoint(std::str::from_utf8(digits).ok()?, radix)
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|&&b| is_whitespace(b)).count();
    &bytes[skip..]
}
