// src/keys/mod.rs

//! The key layer: framing, decoding and encoding of individual FAMOS keys.
//!
//! A FAMOS file is a flat stream of ASCII-framed records of the form
//! `|XX,version,length,payload;`. This module knows nothing about how keys
//! relate to each other; that is the job of [`crate::model`].

// ============================================================================
// Framing Constants (internal use only)
// ============================================================================

/// Every key starts with `|XX,`: marker, two-letter code, separator.
pub(crate) const KEY_TYPE_SIZE: i64 = 4;

/// Code page assumed until a language key says otherwise (Windows Latin-1).
pub const DEFAULT_CODE_PAGE: u32 = 1252;

// ============================================================================
// Submodules
// ============================================================================

mod codec;
mod common;
mod encoder;
mod lexer;

pub use codec::{CodePageCodec, TextCodec};
pub use common::KeyType;
pub use encoder::{KeyLocation, KeyWriter, Placeholder, Token};
pub use lexer::{KeyBody, KeyReader};
