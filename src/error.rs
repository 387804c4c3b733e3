//! Error taxonomy shared by every layer of the parser.
//!
//! Each failure domain gets its own small `#[derive(Error)]` enum rather than
//! one monolithic error type. Message rendering never allocates: offsets
//! are embedded straight into the `#[error("...")]` format string, which
//! `thiserror` expands to ordinary `write!` calls over the formatter the
//! caller already owns.

use thiserror::Error;

/// The byte-machine-level error taxonomy (Layer A). Each variant carries the
/// absolute byte offset, within the *whole* document, of the byte that made
/// the error provable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserError {
    #[error("unexpected extra comma at offset {0}")]
    ExtraComma(u64),

    #[error("expected comma at offset {0}")]
    NoComma(u64),

    #[error("invalid character following '{{' at offset {0}")]
    MapInvalidChar(u64),

    #[error("maximum nesting depth exceeded at offset {0}")]
    StackOverflow(u64),

    #[error("invalid value character at offset {0}")]
    BadValueChar(u64),

    #[error("expected a digit at offset {0}")]
    NumDigitMissing(u64),

    #[error("extra decimal point at offset {0}")]
    ExtraDecimal(u64),

    #[error("exponent magnitude exceeds {max} at offset {offset}", max = crate::parser::ROUGH_MAX_EXPONENT)]
    MaxExponent { offset: u64 },

    #[error("expected exponent digit at offset {0}")]
    NoExpDigit(u64),

    #[error("invalid hex digit in \\u escape at offset {0}")]
    InvalidHexEscape(u64),

    #[error("invalid escape character at offset {0}")]
    InvalidEscape(u64),

    #[error("illegal byte 0x{byte:02x} at offset {offset}")]
    InvalidChar { byte: u8, offset: u64 },

    #[error("invalid character in reserved word at offset {0}")]
    ReservedWordError(u64),

    #[error("closing bracket does not match the opening one at offset {0}")]
    ListMapMismatch(u64),

    #[error("expected ':' at offset {0}")]
    MissingColon(u64),

    #[error("invalid or unexpected UTF-8 byte at offset {0}")]
    BadUtf8(u64),

    #[error("invalid or unpaired UTF-16 surrogate at offset {0}")]
    UtfSurrogate(u64),

    #[error("parsing halted by user callback at offset {0}")]
    UserHalt(u64),
}

impl ParserError {
    /// The absolute document offset this error was raised at.
    pub fn offset(&self) -> u64 {
        match *self {
            ParserError::ExtraComma(o)
            | ParserError::NoComma(o)
            | ParserError::MapInvalidChar(o)
            | ParserError::StackOverflow(o)
            | ParserError::BadValueChar(o)
            | ParserError::NumDigitMissing(o)
            | ParserError::ExtraDecimal(o)
            | ParserError::NoExpDigit(o)
            | ParserError::InvalidHexEscape(o)
            | ParserError::InvalidEscape(o)
            | ParserError::ReservedWordError(o)
            | ParserError::ListMapMismatch(o)
            | ParserError::MissingColon(o)
            | ParserError::BadUtf8(o)
            | ParserError::UtfSurrogate(o)
            | ParserError::UserHalt(o) => o,
            ParserError::MaxExponent { offset } | ParserError::InvalidChar { offset, .. } => {
                offset
            }
        }
    }
}

/// Errors raised by the pull cursor (Layer B): either a propagated
/// [`ParserError`], a reader failure, or a cursor-level protocol violation
/// (e.g. EOF inside an open container, or a destination buffer too small to
/// hold a fragment).
#[derive(Error, Debug)]
pub enum CursorError {
    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error("reader failed: {0}")]
    Reader(#[from] ReaderError),

    #[error("unexpected end of input while inside an open container (offset {0})")]
    UnexpectedEof(u64),

    #[error("fragment at offset {0} does not fit in the input buffer; grow the buffer")]
    BufferTooSmall(u64),

    #[error("expected key '{expected}' but found a different key at offset {offset}")]
    KeyMismatch { expected: &'static str, offset: u64 },

    #[error("chunk_read called without a string value selected, at offset {0}")]
    NotAString(u64),
}

/// Errors raised by the typed extractors in `cursor::extract`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("expected a value of a different type at offset {0}")]
    TypeMismatch(u64),

    #[error("significand overflowed before scaling; cannot represent exactly at offset {0}")]
    NumericOverflow(u64),

    #[error("key enum {actual} does not match the expected key enum {expected}")]
    KeyEnumMismatch { expected: u16, actual: u16 },

    #[error("current state is not a container (list/map) at offset {0}")]
    NotAContainer(u64),
}

/// Errors raised by the `Reader` trait and its reference implementations.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// A fixed-size inline buffer for rendering an error's `Display` output
/// without allocating, for callers (e.g. `no_std`-adjacent embedded hosts)
/// that want the message text but can't afford a heap `String`.
///
/// 128 bytes comfortably holds every message format string above fully
/// expanded with worst-case numeric fields; longer output is truncated
/// rather than panicking.
pub struct MessageBuf {
    buf: [u8; 128],
    len: usize,
}

impl MessageBuf {
    pub fn new() -> Self {
        MessageBuf {
            buf: [0; 128],
            len: 0,
        }
    }

    /// Render `err`'s `Display` implementation into this buffer, truncating
    /// if it doesn't fit, and return the rendered text.
    pub fn render(&mut self, err: &impl std::fmt::Display) -> &str {
        use std::fmt::Write;
        self.len = 0;
        let _ = write!(Writer(self), "{}", err);
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Default for MessageBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter letting `write!` target a `MessageBuf` without allocating,
/// dropping any bytes past capacity instead of erroring.
struct Writer<'a>(&'a mut MessageBuf);

impl<'a> std::fmt::Write for Writer<'a> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        let buf = &mut self.0.buf;
        let available = buf.len() - self.0.len;
        let bytes = s.as_bytes();
        let n = bytes.len().min(available);
        buf[self.0.len..self.0.len + n].copy_from_slice(&bytes[..n]);
        self.0.len += n;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn renders_without_allocating() {
        let err = ParserError::ExtraComma(42);
        let mut buf = MessageBuf::new();
        let msg = buf.render(&err);
        assert_eq!(msg, "unexpected extra comma at offset 42");
    }

    #[test]
    fn truncates_overlong_messages() {
        struct Long;
        impl std::fmt::Display for Long {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", "x".repeat(500))
            }
        }
        let mut buf = MessageBuf::new();
        let msg = buf.render(&Long);
        assert_eq!(msg.len(), 128);
    }
}
