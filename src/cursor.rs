//! Layer B: a pull-style cursor wrapping the byte state machine with buffered
//! I/O, turning it into something a caller can walk depth-first without ever
//! handling a raw buffer boundary itself.
//!
//! Where [`crate::parser::ParserState`] hands back fragments the instant its
//! input runs out, [`Cursor`] absorbs all of that: it owns the buffer, pulls
//! more bytes from a [`crate::reader::Reader`] as needed, and silently
//! re-drives the scanner across internal fragments (keys, numbers, reserved
//! words) that the caller never needs to see one byte at a time. Only two
//! kinds of fragment ever reach the caller: a string value (via
//! [`Cursor::chunk_read`]) and a container close, which the cursor reports
//! one level at a time even when the scanner closed several brackets in a
//! single internal step — see the `own_stack` field below.

use num_traits::{CheckedAdd, CheckedMul, CheckedSub, FromPrimitive, Zero};

use crate::error::{CursorError, ExtractError};
use crate::keyset::KeySet;
use crate::options::{JsonParserOptions, JsonParserOptionsBuilder};
use crate::parser::{ParseContext, ParserState};
use crate::reader::Reader;
use crate::stack::ContainerKind;
use crate::value::{Special, Value, ValueKind};

/// What the last [`Cursor::pull`] landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    /// Nothing has been read yet; the document's top-level value is next.
    Begin,
    /// An object just opened. Call `pull` again to step into its first key,
    /// or [`Cursor::up`] to skip the whole object.
    Map,
    /// An array just opened, analogous to `Map`.
    List,
    /// A scalar (number, string, bool, null, or the `NaN`/`Infinity`
    /// specials) is current. Use a typed extractor or `chunk_read` to read
    /// it.
    Datum,
    /// An object just closed. Reported once per closing `}`, even if several
    /// closed back to back inside one internal step.
    AscendMap,
    /// An array just closed, analogous to `AscendMap`.
    AscendList,
    /// The document (or, in streaming mode, the input) is exhausted.
    NoData,
}

fn ascend_state(kind: ContainerKind) -> PullState {
    match kind {
        ContainerKind::Array => PullState::AscendList,
        ContainerKind::Object => PullState::AscendMap,
    }
}

/// Decode progress through a string value that may span more bytes than the
/// cursor's buffer held in one go.
///
/// Unlike the scanner's own `Value::significand_val` straddle slot (§4.1's
/// code-point fragment, used when a caller drives Layer A directly), the
/// cursor never needs to carry a decoded code point across a `chunk_read`
/// boundary: `decode_string_bytes` re-derives escapes and raw UTF-8 straight
/// from `Cursor::buffer`, which stays valid (via fragment compaction keyed
/// off `sc.pos`) until the string fully drains.
struct StringCursor {
    /// Absolute index into `Cursor::buffer` of the next undecoded byte.
    pos: usize,
    /// `true` if more fragments of this string remain after the buffer
    /// content currently available.
    fragment: bool,
}

/// A pull-style cursor over a streamed JSON document.
///
/// Drives the byte state machine depth-first (`pull`/`up`) without the caller
/// ever slicing up the input itself; `R` supplies bytes on demand as the
/// cursor's buffer runs dry.
pub struct Cursor<'ks, R: Reader> {
    reader: R,
    parser: ParserState,
    buffer: Box<[u8]>,
    /// Bytes `buffer[..fed]` have already been handed to `parser.parse`.
    fed: usize,
    /// Bytes `buffer[..filled]` hold valid data read from `reader`.
    filled: usize,
    eof: bool,
    /// Absolute document offset of `buffer[0]`.
    base_offset: u64,
    /// Mirrors the scanner's own nesting, one push per `Map`/`List` reported
    /// to the caller. A closing bracket doesn't itself produce a `Value`, so
    /// `parser.depth()` can drop by more than one inside a single internal
    /// step; `pull` drains this one level at a time so the caller always
    /// sees exactly one `AscendMap`/`AscendList` per closed container.
    own_stack: Vec<ContainerKind>,
    current: Option<Value>,
    string_cursor: Option<StringCursor>,
    /// The current (or current-to-be) value's key, assembled piece by piece
    /// as key fragments arrive. Cleared at the top of every `pull`.
    key_scratch: Vec<u8>,
    key_set: Option<&'ks KeySet<'ks>>,
    started: bool,
}

impl<'ks, R: Reader> Cursor<'ks, R> {
    /// Build a cursor with no key set: `key_enum` on every reported value is
    /// [`crate::value::NO_KEY_MATCH`].
    pub fn new(reader: R, options: JsonParserOptions) -> Self {
        Self::with_key_set(reader, options, None)
    }

    /// Build a cursor that eagerly matches object keys against `key_set`.
    pub fn with_key_set(
        reader: R,
        options: JsonParserOptions,
        key_set: Option<&'ks KeySet<'ks>>,
    ) -> Self {
        let parser_options = JsonParserOptionsBuilder::default()
            .with_stack_capacity(options.stack_capacity())
            .with_values_capacity(1)
            .with_buffer_size(options.buffer_size())
            .with_streaming(options.streaming())
            .build();
        Cursor {
            reader,
            parser: ParserState::new(&parser_options),
            buffer: vec![0u8; options.buffer_size().max(1)].into_boxed_slice(),
            fed: 0,
            filled: 0,
            eof: false,
            base_offset: 0,
            own_stack: Vec::with_capacity(options.stack_capacity().min(64)),
            current: None,
            string_cursor: None,
            key_scratch: Vec::new(),
            key_set,
            started: false,
        }
    }

    /// Current nesting depth, as last reported to the caller (see
    /// `own_stack`'s doc comment on why this can briefly lag the scanner's
    /// own depth).
    pub fn depth(&self) -> usize {
        self.own_stack.len()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn approx_offset(&self) -> u64 {
        self.base_offset + self.filled as u64
    }

    /// Advance to the next structural event: a container opening or closing,
    /// or a scalar value. Returns [`PullState::Begin`] exactly once, on the
    /// very first call.
    pub fn pull(&mut self) -> Result<PullState, CursorError> {
        if !self.started {
            self.started = true;
            return Ok(PullState::Begin);
        }

        self.drain_current_string()?;
        self.current = None;
        self.key_scratch.clear();

        if let Some(kind) = self.pop_owed_ascend() {
            return Ok(ascend_state(kind));
        }

        match self.next_value()? {
            Some(value) => Ok(self.report(value)),
            None => match self.pop_owed_ascend() {
                Some(kind) => Ok(ascend_state(kind)),
                None => Ok(PullState::NoData),
            },
        }
    }

    /// Skip to just after the container the cursor is currently inside, as
    /// if the caller had called [`Cursor::pull`] repeatedly and discarded
    /// everything until the matching `AscendMap`/`AscendList`. A no-op walk
    /// to [`PullState::NoData`] if called outside any container.
    pub fn up(&mut self) -> Result<PullState, CursorError> {
        let target = self.own_stack.len().saturating_sub(1);
        loop {
            let state = self.pull()?;
            match state {
                PullState::NoData => return Ok(state),
                PullState::AscendMap | PullState::AscendList if self.own_stack.len() == target => {
                    return Ok(state);
                }
                _ => {}
            }
        }
    }

    /// The current value's key, if any (object member) — `None` for array
    /// elements and the top-level value. Valid until the next `pull`.
    pub fn get_key(&self) -> Option<&str> {
        if self.key_scratch.is_empty() {
            None
        } else {
            std::str::from_utf8(&self.key_scratch).ok()
        }
    }

    /// The current value's key-set match, or
    /// [`crate::value::NO_KEY_MATCH`] if it didn't match (or no key set was
    /// supplied, or there is no key).
    pub fn key_enum(&self) -> u16 {
        self.current.map(|v| v.key_enum).unwrap_or(crate::value::NO_KEY_MATCH)
    }

    /// Read the next chunk of the current string value's UTF-8 bytes into
    /// `dst`, returning the number of bytes written (`0` once the string is
    /// exhausted). `expected_key` checks the current value's `key_enum`
    /// first, mirroring the typed extractors.
    ///
    /// Drains escape sequences and raw UTF-8 straight from the input buffer,
    /// re-driving the scanner for more bytes as needed; never returns a
    /// partial escape or partial UTF-8 sequence split across two calls.
    pub fn chunk_read(
        &mut self,
        dst: &mut [u8],
        expected_key: Option<u16>,
    ) -> Result<usize, CursorError> {
        let value = self
            .current
            .ok_or_else(|| CursorError::NotAString(self.approx_offset()))?;
        if value.kind() != ValueKind::String {
            return Err(CursorError::NotAString(self.approx_offset()));
        }
        if let Some(expected) = expected_key {
            if value.key_enum != expected {
                return Err(CursorError::KeyMismatch {
                    expected: "<expected key>",
                    offset: self.approx_offset(),
                });
            }
        }

        let mut sc = match self.string_cursor.take() {
            Some(sc) => sc,
            None => return Ok(0),
        };

        let mut written = 0usize;
        loop {
            if written == dst.len() {
                self.string_cursor = Some(sc);
                return Ok(written);
            }
            let (produced, outcome) = decode_string_bytes(
                &self.buffer[..self.filled],
                &mut sc.pos,
                !sc.fragment,
                &mut dst[written..],
            );
            written += produced;
            match outcome {
                DecodeOutcome::Done => return Ok(written),
                DecodeOutcome::DstFull => {
                    self.string_cursor = Some(sc);
                    return Ok(written);
                }
                DecodeOutcome::NeedMoreInput => {
                    if produced > 0 {
                        self.string_cursor = Some(sc);
                        return Ok(written);
                    }
                    if !sc.fragment {
                        return Err(CursorError::UnexpectedEof(self.approx_offset()));
                    }
                    match self.drive_raw(Some(&mut sc.pos))? {
                        Some(v) if v.kind() == ValueKind::String => {
                            sc.fragment = v.is_val_fragment();
                        }
                        _ => return Err(CursorError::UnexpectedEof(self.approx_offset())),
                    }
                }
            }
        }
    }

    /// Silently drain whatever's left of the current string, for the caller
    /// that ignored a fragmented value entirely and just called `pull`
    /// again.
    fn drain_current_string(&mut self) -> Result<(), CursorError> {
        if self.string_cursor.is_none() {
            return Ok(());
        }
        let mut sink = [0u8; 256];
        loop {
            if self.chunk_read(&mut sink, None)? == 0 {
                break;
            }
        }
        Ok(())
    }

    fn pop_owed_ascend(&mut self) -> Option<ContainerKind> {
        if self.own_stack.len() > self.parser.depth() {
            self.own_stack.pop()
        } else {
            None
        }
    }

    /// Drive the scanner until it produces a value the caller should see,
    /// auto-continuing anything purely internal (key fragments, the
    /// key-done/value-not-started "middle" state, and non-string scalar
    /// fragments).
    fn next_value(&mut self) -> Result<Option<Value>, CursorError> {
        loop {
            match self.drive_raw(None)? {
                Some(v) => {
                    self.capture_key(&v);
                    let internal_only = v.is_key_fragment()
                        || v.is_middle()
                        || (v.is_val_fragment() && v.kind() != ValueKind::String);
                    if internal_only {
                        continue;
                    }
                    return Ok(Some(v));
                }
                None => return Ok(None),
            }
        }
    }

    /// Accumulate this value's key bytes into `key_scratch`.
    ///
    /// `key_length` is the *cumulative* length of the key seen so far, but
    /// `key_offset` only locates the bytes belonging to the call that just
    /// ran (earlier fragments live at positions this call's buffer slice no
    /// longer covers, or already got copied out). So the new bytes to copy
    /// are always the last `key_length - key_scratch.len()` of them,
    /// starting at `key_offset` — which is also why a key that closed, then
    /// saw several whitespace-only "middle" reports before its value
    /// started, doesn't re-append anything on the repeats: `key_length`
    /// stops growing once the key closes, so `key_length - key_scratch.len()`
    /// is `0` from the second report on.
    fn capture_key(&mut self, v: &Value) {
        let total = v.key_length as usize;
        let already = self.key_scratch.len();
        if total <= already {
            return;
        }
        let new_len = total - already;
        let start = v.key_offset as usize;
        self.key_scratch.extend_from_slice(&self.buffer[start..start + new_len]);
    }

    /// Feed the scanner and return the next raw value it produces, localized
    /// to `self.buffer` (rather than the just-fed slice). Returns `None`
    /// when a container-close backlog needs draining first, or the document
    /// is exhausted.
    ///
    /// `carry`, if given, is an index into `self.buffer` that must survive
    /// any compaction this call performs (used by `chunk_read` to keep a
    /// string decode position valid); without it, a full buffer is reclaimed
    /// outright since nothing else in flight (a key, a number) needs its raw
    /// bytes protected past the point they were produced.
    fn drive_raw(&mut self, mut carry: Option<&mut usize>) -> Result<Option<Value>, CursorError> {
        loop {
            if self.fed < self.filled {
                let mut ctx = ParseContext {
                    key_set: self.key_set,
                    on_batch: None,
                };
                let old_fed = self.fed;
                let base = self.base_offset + old_fed as u64;
                let n = self.parser.parse(&mut ctx, &self.buffer[old_fed..self.filled], base)?;
                self.fed += n;
                if !self.parser.values().is_empty() {
                    let v = localize(self.parser.values()[0], old_fed);
                    self.parser.clear_values();
                    return Ok(Some(v));
                }
            }

            if self.own_stack.len() > self.parser.depth() {
                return Ok(None);
            }

            if self.eof {
                if self.parser.has_pending_fragment() {
                    self.parser.finish()?;
                    if !self.parser.values().is_empty() {
                        let v = localize(self.parser.values()[0], self.fed);
                        self.parser.clear_values();
                        return Ok(Some(v));
                    }
                    return Err(CursorError::UnexpectedEof(self.approx_offset()));
                }
                return Ok(None);
            }

            if self.filled == self.buffer.len() {
                let keep_from = carry.as_deref().copied().unwrap_or(self.filled);
                if keep_from == 0 {
                    return Err(CursorError::BufferTooSmall(self.approx_offset()));
                }
                let kept = fragment::fragcompact(&mut self.buffer, self.filled, keep_from);
                self.base_offset += keep_from as u64;
                self.filled = kept;
                self.fed = kept;
                if let Some(c) = carry.as_deref_mut() {
                    *c -= keep_from;
                }
            }

            let n = self.reader.read(&mut self.buffer[self.filled..])?;
            if n == 0 {
                self.eof = true;
            } else {
                self.filled += n;
            }
        }
    }

    fn report(&mut self, value: Value) -> PullState {
        match value.kind() {
            ValueKind::ArrayBegin => {
                self.own_stack.push(ContainerKind::Array);
                self.current = Some(value);
                PullState::List
            }
            ValueKind::ObjectBegin => {
                self.own_stack.push(ContainerKind::Object);
                self.current = Some(value);
                PullState::Map
            }
            ValueKind::String => {
                self.string_cursor = Some(StringCursor {
                    pos: value.strval_offset as usize,
                    fragment: value.is_val_fragment(),
                });
                self.current = Some(value);
                PullState::Datum
            }
            _ => {
                self.current = Some(value);
                PullState::Datum
            }
        }
    }

    fn current_value(&self) -> Result<Value, ExtractError> {
        self.current.ok_or(ExtractError::TypeMismatch(self.approx_offset()))
    }

    fn check_key(&self, value: &Value, expected_key: Option<u16>) -> Result<(), ExtractError> {
        if let Some(expected) = expected_key {
            if value.key_enum != expected {
                return Err(ExtractError::KeyEnumMismatch {
                    expected,
                    actual: value.key_enum,
                });
            }
        }
        Ok(())
    }

    /// Extract the current value as a non-negative integer.
    pub fn get_uint(&self, expected_key: Option<u16>) -> Result<u64, ExtractError> {
        let value = self.current_value()?;
        self.check_key(&value, expected_key)?;
        if value.kind() != ValueKind::Numeric || value.exp_val != 0 || value.is_negative_significand()
        {
            return Err(ExtractError::TypeMismatch(self.approx_offset()));
        }
        if value.significand_overflowed() {
            return Err(ExtractError::NumericOverflow(self.approx_offset()));
        }
        Ok(value.significand_val)
    }

    /// Extract the current value as a signed integer, mirroring the
    /// teacher's generic `current_int`: any `num_traits` type that can be
    /// checked-constructed from a `u64` magnitude and negated.
    pub fn get_int<I>(&self, expected_key: Option<u16>) -> Result<I, ExtractError>
    where
        I: FromPrimitive + Zero + CheckedAdd + CheckedSub + CheckedMul,
    {
        let value = self.current_value()?;
        self.check_key(&value, expected_key)?;
        if value.kind() != ValueKind::Numeric || value.exp_val != 0 {
            return Err(ExtractError::TypeMismatch(self.approx_offset()));
        }
        if value.significand_overflowed() {
            return Err(ExtractError::NumericOverflow(self.approx_offset()));
        }
        let magnitude = I::from_u64(value.significand_val)
            .ok_or(ExtractError::NumericOverflow(self.approx_offset()))?;
        if value.is_negative_significand() {
            I::zero()
                .checked_sub(&magnitude)
                .ok_or(ExtractError::NumericOverflow(self.approx_offset()))
        } else {
            Ok(magnitude)
        }
    }

    /// Extract the current value as an `f64`, scaling the significand by its
    /// decimal exponent, or mapping `NaN`/`Infinity` specials directly.
    pub fn get_float(&self, expected_key: Option<u16>) -> Result<f64, ExtractError> {
        let value = self.current_value()?;
        self.check_key(&value, expected_key)?;
        match value.kind() {
            ValueKind::Numeric => {
                let magnitude = value.significand_val as f64 * 10f64.powi(value.exp_val);
                Ok(if value.is_negative_significand() {
                    -magnitude
                } else {
                    magnitude
                })
            }
            ValueKind::Special => match value.special() {
                Some(Special::NaN) => Ok(f64::NAN),
                Some(Special::Infinity) => Ok(if value.is_negative_significand() {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }),
                _ => Err(ExtractError::TypeMismatch(self.approx_offset())),
            },
            _ => Err(ExtractError::TypeMismatch(self.approx_offset())),
        }
    }

    /// Extract the current value as a `bool`.
    pub fn get_bool(&self, expected_key: Option<u16>) -> Result<bool, ExtractError> {
        let value = self.current_value()?;
        self.check_key(&value, expected_key)?;
        match value.special() {
            Some(Special::True) => Ok(true),
            Some(Special::False) => Ok(false),
            _ => Err(ExtractError::TypeMismatch(self.approx_offset())),
        }
    }

    /// Confirm the current value is `null`.
    pub fn verify_null(&self, expected_key: Option<u16>) -> Result<(), ExtractError> {
        let value = self.current_value()?;
        self.check_key(&value, expected_key)?;
        match value.special() {
            Some(Special::Null) => Ok(()),
            _ => Err(ExtractError::TypeMismatch(self.approx_offset())),
        }
    }

    /// Confirm the current (just-opened) container is an array.
    pub fn verify_list(&self) -> Result<(), ExtractError> {
        match self.current.map(|v| v.kind()) {
            Some(ValueKind::ArrayBegin) => Ok(()),
            _ => Err(ExtractError::NotAContainer(self.approx_offset())),
        }
    }

    /// Confirm the current (just-opened) container is an object.
    pub fn verify_map(&self) -> Result<(), ExtractError> {
        match self.current.map(|v| v.kind()) {
            Some(ValueKind::ObjectBegin) => Ok(()),
            _ => Err(ExtractError::NotAContainer(self.approx_offset())),
        }
    }
}

/// Rewrite `v`'s buffer-relative offsets (reported relative to whatever
/// slice was just fed to `parser.parse`) into offsets relative to the
/// cursor's own buffer.
fn localize(mut v: Value, slice_base: usize) -> Value {
    v.key_offset = v.key_offset.saturating_add(slice_base as u32);
    v.strval_offset = v.strval_offset.saturating_add(slice_base as u32);
    v
}

use crate::fragment;

enum DecodeOutcome {
    Done,
    DstFull,
    NeedMoreInput,
}

fn parse_hex4(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &b| {
        let d = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => 0,
        };
        acc * 16 + d as u16
    })
}

/// Decode as much of `src[*pos..]` as fits in `dst`, advancing `*pos` and
/// returning the number of bytes written plus why it stopped. `complete`
/// means `src` contains this string's closing quote; without it, running
/// off the end of `src` always means "come back with more input" rather
/// than "malformed string".
fn decode_string_bytes(
    src: &[u8],
    pos: &mut usize,
    complete: bool,
    dst: &mut [u8],
) -> (usize, DecodeOutcome) {
    let end = src.len();
    let mut written = 0usize;
    loop {
        if written == dst.len() {
            return (written, DecodeOutcome::DstFull);
        }
        if *pos >= end {
            return (written, DecodeOutcome::NeedMoreInput);
        }
        let b = src[*pos];
        if b == b'"' {
            if complete {
                *pos += 1;
                return (written, DecodeOutcome::Done);
            }
            return (written, DecodeOutcome::NeedMoreInput);
        }
        if b == b'\\' {
            if *pos + 1 >= end {
                return (written, DecodeOutcome::NeedMoreInput);
            }
            let esc = src[*pos + 1];
            let (out, consumed): (Option<char>, usize) = match esc {
                b'"' => (Some('"'), 2),
                b'\\' => (Some('\\'), 2),
                b'/' => (Some('/'), 2),
                b'b' => (Some('\u{8}'), 2),
                b'f' => (Some('\u{c}'), 2),
                b'n' => (Some('\n'), 2),
                b'r' => (Some('\r'), 2),
                b't' => (Some('\t'), 2),
                b'u' => {
                    if *pos + 6 > end {
                        return (written, DecodeOutcome::NeedMoreInput);
                    }
                    let cp1 = parse_hex4(&src[*pos + 2..*pos + 6]);
                    if (0xD800..=0xDBFF).contains(&cp1) {
                        if *pos + 12 > end {
                            return (written, DecodeOutcome::NeedMoreInput);
                        }
                        let cp2 = parse_hex4(&src[*pos + 8..*pos + 12]);
                        let scalar = 0x10000 + ((cp1 as u32 - 0xD800) << 10) + (cp2 as u32 - 0xDC00);
                        (char::from_u32(scalar), 12)
                    } else {
                        (char::from_u32(cp1 as u32), 6)
                    }
                }
                _ => (None, 2),
            };
            let ch = out.unwrap_or('\u{FFFD}');
            let mut tmp = [0u8; 4];
            let s = ch.encode_utf8(&mut tmp);
            if written + s.len() > dst.len() {
                return (written, DecodeOutcome::DstFull);
            }
            dst[written..written + s.len()].copy_from_slice(s.as_bytes());
            written += s.len();
            *pos += consumed;
            continue;
        }

        let mut j = *pos;
        let room = dst.len() - written;
        while j < end && src[j] != b'"' && src[j] != b'\\' && (j - *pos) < room {
            j += 1;
        }
        let n = j - *pos;
        dst[written..written + n].copy_from_slice(&src[*pos..j]);
        written += n;
        *pos = j;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reader::SliceReader;

    fn drain_string(cursor: &mut Cursor<SliceReader>) -> String {
        let mut out = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = cursor.chunk_read(&mut buf, None).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn walks_a_simple_document() {
        let data = br#"{"a":1,"b":[true,false,null],"c":"hi"}"#;
        let mut cursor = Cursor::new(SliceReader::new(data), JsonParserOptions::default());

        assert_eq!(cursor.pull().unwrap(), PullState::Begin);
        assert_eq!(cursor.pull().unwrap(), PullState::Map);

        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.get_key(), Some("a"));
        assert_eq!(cursor.get_uint(None).unwrap(), 1);

        assert_eq!(cursor.pull().unwrap(), PullState::List);
        assert_eq!(cursor.get_key(), Some("b"));
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert!(cursor.get_bool(None).unwrap());
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert!(!cursor.get_bool(None).unwrap());
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        cursor.verify_null(None).unwrap();
        assert_eq!(cursor.pull().unwrap(), PullState::AscendList);

        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.get_key(), Some("c"));
        assert_eq!(drain_string(&mut cursor), "hi");

        assert_eq!(cursor.pull().unwrap(), PullState::AscendMap);
        assert_eq!(cursor.pull().unwrap(), PullState::NoData);
    }

    #[test]
    fn up_skips_a_nested_container() {
        let data = br#"{"skip":{"x":[1,2,3]},"after":42}"#;
        let mut cursor = Cursor::new(SliceReader::new(data), JsonParserOptions::default());

        assert_eq!(cursor.pull().unwrap(), PullState::Begin);
        assert_eq!(cursor.pull().unwrap(), PullState::Map);
        assert_eq!(cursor.pull().unwrap(), PullState::Map);
        assert_eq!(cursor.get_key(), Some("skip"));
        assert_eq!(cursor.up().unwrap(), PullState::AscendMap);

        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.get_key(), Some("after"));
        assert_eq!(cursor.get_uint(None).unwrap(), 42);
        assert_eq!(cursor.pull().unwrap(), PullState::AscendMap);
        assert_eq!(cursor.pull().unwrap(), PullState::NoData);
    }

    #[test]
    fn ignoring_a_fragmented_string_does_not_desync_the_stream() {
        let data = br#"{"a":"long string value here","b":true}"#;
        let mut cursor =
            Cursor::new(SliceReader::new(data), JsonParserOptions::default());

        assert_eq!(cursor.pull().unwrap(), PullState::Begin);
        assert_eq!(cursor.pull().unwrap(), PullState::Map);
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.get_key(), Some("a"));
        // Never call chunk_read; pull() must silently drain it.
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.get_key(), Some("b"));
        assert!(cursor.get_bool(None).unwrap());
    }

    #[test]
    fn key_set_matches_objects_eagerly() {
        let keys = ["age", "name"];
        let key_set = KeySet::new(&keys).unwrap();
        let data = br#"{"name":"ok","age":9}"#;
        let options = JsonParserOptionsBuilder::default().build();
        let mut cursor = Cursor::with_key_set(SliceReader::new(data), options, Some(&key_set));

        assert_eq!(cursor.pull().unwrap(), PullState::Begin);
        assert_eq!(cursor.pull().unwrap(), PullState::Map);
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.key_enum(), 1);
        assert_eq!(drain_string(&mut cursor), "ok");
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.key_enum(), 0);
        assert_eq!(cursor.get_uint(None).unwrap(), 9);
    }

    #[test]
    fn rejects_mismatched_closing_bracket() {
        let data = b"[1,2}";
        let mut cursor = Cursor::new(SliceReader::new(data), JsonParserOptions::default());
        assert_eq!(cursor.pull().unwrap(), PullState::Begin);
        assert_eq!(cursor.pull().unwrap(), PullState::List);
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert!(cursor.pull().is_err());
    }

    /// A reader that trickles bytes in a handful at a time, to exercise
    /// fragment continuation across many small buffer fills.
    struct TinyReader<'a> {
        data: &'a [u8],
        pos: usize,
        step: usize,
    }

    impl<'a> Reader for TinyReader<'a> {
        fn read(&mut self, buffer: &mut [u8]) -> Result<usize, crate::error::ReaderError> {
            let remaining = &self.data[self.pos..];
            let n = remaining.len().min(buffer.len()).min(self.step);
            buffer[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn reassembles_a_key_and_string_split_across_many_tiny_reads() {
        let data = br#"{"a-rather-long-key-name":"a rather long string value, with an escape: \"quoted\" and é"}"#;
        let options = JsonParserOptionsBuilder::default()
            .with_buffer_size(16)
            .build();
        let reader = TinyReader {
            data,
            pos: 0,
            step: 3,
        };
        let mut cursor = Cursor::new(reader, options);

        assert_eq!(cursor.pull().unwrap(), PullState::Begin);
        assert_eq!(cursor.pull().unwrap(), PullState::Map);
        assert_eq!(cursor.pull().unwrap(), PullState::Datum);
        assert_eq!(cursor.get_key(), Some("a-rather-long-key-name"));
        assert_eq!(
            drain_string(&mut cursor),
            "a rather long string value, with an escape: \"quoted\" and \u{e9}"
        );
        assert_eq!(cursor.pull().unwrap(), PullState::AscendMap);
        assert_eq!(cursor.pull().unwrap(), PullState::NoData);
    }

    #[test]
    fn streaming_mode_yields_multiple_top_level_values() {
        let options = JsonParserOptionsBuilder::default()
            .with_streaming(true)
            .build();
        let mut cursor = Cursor::new(SliceReader::new(b"1 2 3"), options);

        assert_eq!(cursor.pull().unwrap(), PullState::Begin);
        for expected in [1u64, 2, 3] {
            assert_eq!(cursor.pull().unwrap(), PullState::Datum);
            assert_eq!(cursor.get_uint(None).unwrap(), expected);
        }
        assert_eq!(cursor.pull().unwrap(), PullState::NoData);
    }
}
