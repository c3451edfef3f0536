//! XML Reader Module
//!
//! - SliceReader: zero-copy strict pull reader over a byte slice
//! - Events: borrowed XML event types

pub mod events;
pub mod slice;
