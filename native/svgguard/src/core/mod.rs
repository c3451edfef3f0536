//! Core XML primitives for the structural check
//!
//! - Scanner: memchr-accelerated delimiter detection
//! - Tokenizer: strict, non-recovering token extraction
//! - Entities: reference decoding for the decoded pattern pass
//! - Attributes: strict attribute parsing
//! - Encoding: fail-closed input decoding

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
