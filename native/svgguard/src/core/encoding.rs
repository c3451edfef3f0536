//! Input Encoding Detection
//!
//! Untrusted content is only ever inspected as UTF-8. UTF-16 input (by BOM or
//! by the `<\0` / `\0<` byte pattern) and invalid UTF-8 are refused rather
//! than transcoded, so the bytes we scan are the bytes a browser decodes.

use thiserror::Error;

/// Encoding guessed from the first bytes of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("UTF-16 content is not accepted")]
    Utf16(XmlEncoding),
    #[error("invalid UTF-8 at byte {0}")]
    InvalidUtf8(usize),
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// View raw bytes as UTF-8 text, skipping a UTF-8 BOM
pub fn as_utf8(input: &[u8]) -> Result<&str, EncodingError> {
    match XmlEncoding::detect(input) {
        XmlEncoding::Utf8 => {}
        other => return Err(EncodingError::Utf16(other)),
    }

    let body = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    std::str::from_utf8(body).map_err(|e| EncodingError::InvalidUtf8(e.valid_up_to()))
}

/// Whether a declared `encoding="..."` names a charset we scan correctly
pub fn is_supported_declared_encoding(label: &[u8]) -> bool {
    const SUPPORTED: &[&[u8]] = &[b"utf-8", b"utf8", b"us-ascii", b"ascii"];
    SUPPORTED.iter().any(|s| s.eq_ignore_ascii_case(label))
}
