//! # noajson
//!
//! An incremental, streaming JSON parser for environments with bounded memory
//! and no dynamic allocation on the hot path. Input arrives as an arbitrarily
//! sized byte stream; output is a sequence of parse events emitted as soon as
//! a fixed, caller-provided buffer can hold them. Parsing resumes across
//! buffer boundaries that split any token, including the interior of a
//! multi-byte UTF-8 sequence or a `\uXXXX` surrogate pair.
//!
//! The crate is organized in two layers:
//!
//! - [`parser`] (Layer A) is the byte-driven state machine. It consumes one
//!   byte at a time, writes completed or fragmentary [`value::Value`] records
//!   into a caller-owned array, and never allocates.
//! - [`cursor`] (Layer B) wraps Layer A with a buffered [`reader::Reader`],
//!   fragment compaction, and typed extractors, presenting a depth-first
//!   pull interface a client can walk without ever seeing a raw buffer
//!   boundary.
//!
//! ## Example
//!
//! ```
//! use noajson::cursor::{Cursor, PullState};
//! use noajson::options::JsonParserOptions;
//! use noajson::reader::SliceReader;
//!
//! let json = br#"{"name":"Elvis","age":42}"#;
//! let mut cursor = Cursor::new(SliceReader::new(json), JsonParserOptions::default());
//!
//! assert_eq!(cursor.pull().unwrap(), PullState::Begin);
//! assert_eq!(cursor.pull().unwrap(), PullState::Map);
//!
//! assert_eq!(cursor.pull().unwrap(), PullState::Datum);
//! assert_eq!(cursor.get_key(), Some("name"));
//!
//! assert_eq!(cursor.pull().unwrap(), PullState::Datum);
//! assert_eq!(cursor.get_key(), Some("age"));
//! assert_eq!(cursor.get_uint(None).unwrap(), 42);
//!
//! assert_eq!(cursor.pull().unwrap(), PullState::AscendMap);
//! assert_eq!(cursor.pull().unwrap(), PullState::NoData);
//! ```
//!
//! ## Parsing from a `std::io::Read`
//!
//! [`reader::IoReader`] adapts any [`std::io::Read`] into a
//! [`reader::Reader`], letting the cursor pull bytes from a file or socket
//! without reading the whole thing into memory first.
//!
//! ```no_run
//! use noajson::cursor::Cursor;
//! use noajson::options::JsonParserOptions;
//! use noajson::reader::IoReader;
//! use std::fs::File;
//!
//! let file = File::open("data.json").unwrap();
//! let mut cursor = Cursor::new(IoReader::new(file), JsonParserOptions::default());
//! cursor.pull().unwrap();
//! ```
//!
//! ## Driving Layer A directly
//!
//! Most callers want [`cursor::Cursor`]. Layer A is exposed directly for
//! callers that want to own the buffer and the refill policy themselves (for
//! example, a `no_std`-adjacent host with its own byte source), at the cost
//! of handling fragment compaction manually (see [`fragment::fragcompact`]).
//!
//! ```
//! use noajson::options::JsonParserOptions;
//! use noajson::parser::{ParseContext, ParserState};
//!
//! let options = JsonParserOptions::default();
//! let mut state = ParserState::new(&options);
//! let mut ctx = ParseContext::new();
//! state.parse(&mut ctx, br#"[1,2,3]"#, 0).unwrap();
//! assert_eq!(state.values().len(), 4); // ArrayBegin + 3 numerics
//! ```
pub mod cursor;
pub mod error;
pub mod fragment;
pub mod keyset;
pub mod options;
pub mod parser;
pub mod reader;
pub mod reset;
pub mod stack;
pub mod value;

pub use cursor::{Cursor, PullState};
pub use error::{CursorError, ExtractError, ParserError, ReaderError};
pub use keyset::KeySet;
pub use options::{JsonParserOptions, JsonParserOptionsBuilder};
pub use parser::{ParseContext, ParserState};
pub use reader::{IoReader, Reader, SliceReader};
pub use value::{Special, Value, ValueKind};
