//! Error types for the atril PDF engine.

use thiserror::Error;

/// Primary error type for PDF parsing and interpretation.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("missing %PDF- header")]
    MalformedHeader,

    #[error("no valid xref table found")]
    NoValidXRef,

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("key not found: {0}")]
    KeyError(String),

    #[error("{filter} decode failed: {reason}")]
    FilterError { filter: String, reason: String },

    #[error("CMap error: {0}")]
    CMapError(String),

    #[error("unknown glyph name: {0}")]
    UnknownGlyph(String),

    #[error("invalid unicode codepoint: {0:#x}")]
    InvalidUnicode(u32),

    #[error("unsupported feature: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
