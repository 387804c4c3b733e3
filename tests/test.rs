//! Integration tests driving the public [`noajson::Cursor`] API end to end,
//! covering representative resumption scenarios and fragment invariance
//! across arbitrary buffer-boundary splits.

use noajson::cursor::PullState;
use noajson::options::{JsonParserOptions, JsonParserOptionsBuilder};
use noajson::reader::{IoReader, Reader, SliceReader};
use noajson::{Cursor, KeySet};

/// Drain a whole document, collecting every [`PullState`] in order and
/// silently draining any string value along the way (mirroring a caller that
/// only cares about structure).
fn walk(json: &[u8]) -> Vec<PullState> {
    let mut cursor = Cursor::new(SliceReader::new(json), JsonParserOptions::default());
    let mut out = Vec::new();
    loop {
        let state = cursor.pull().unwrap();
        out.push(state);
        if state == PullState::NoData {
            break;
        }
    }
    out
}

/// A flat object with one negative-exponent numeric value.
#[test]
fn scenario_flat_object_with_negative_exponent() {
    let data = br#"{"a":1,"b":-2.5e2}"#;
    let mut cursor = Cursor::new(SliceReader::new(data), JsonParserOptions::default());

    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert_eq!(cursor.pull().unwrap(), PullState::Map);

    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.get_key(), Some("a"));
    assert_eq!(cursor.get_uint(None).unwrap(), 1);

    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.get_key(), Some("b"));
    assert_eq!(cursor.get_float(None).unwrap(), -250.0);

    assert_eq!(cursor.pull().unwrap(), PullState::AscendMap);
    assert_eq!(cursor.pull().unwrap(), PullState::NoData);
}

/// Scenario #2: the reserved-word tokens, including the non-standard
/// `NaN`/`Infinity`/`-Infinity` extensions.
#[test]
fn scenario_reserved_words() {
    let data = b"[true,false,null,NaN,Infinity,-Infinity]";
    let mut cursor = Cursor::new(SliceReader::new(data), JsonParserOptions::default());

    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert_eq!(cursor.pull().unwrap(), PullState::List);

    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert!(cursor.get_bool(None).unwrap());
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert!(!cursor.get_bool(None).unwrap());
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    cursor.verify_null(None).unwrap();
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert!(cursor.get_float(None).unwrap().is_nan());
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.get_float(None).unwrap(), f64::INFINITY);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.get_float(None).unwrap(), f64::NEG_INFINITY);

    assert_eq!(cursor.pull().unwrap(), PullState::AscendList);
    assert_eq!(cursor.pull().unwrap(), PullState::NoData);
}

/// Scenario #3: a string delivered in fragments that split a `\uXXXX` escape
/// down the middle.
#[test]
fn scenario_string_split_inside_hex_escape() {
    let options = JsonParserOptionsBuilder::default().with_buffer_size(4).build();
    let mut cursor = Cursor::new(TrickleReader::new(br#""café""#, &[8]), options);
    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(drain_string(&mut cursor), "caf\u{e9}");
    assert_eq!(cursor.pull().unwrap(), PullState::NoData);
}

/// Scenario #4: a string split inside a UTF-16 surrogate pair.
#[test]
fn scenario_string_split_inside_surrogate_pair() {
    let options = JsonParserOptionsBuilder::default().with_buffer_size(4).build();
    let mut cursor = Cursor::new(TrickleReader::new(br#""😀""#, &[7]), options);
    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(drain_string(&mut cursor), "\u{1F600}");
}

/// Scenario #5: a truncated document (EOF inside an open array) is reported
/// as an error rather than silently accepted.
#[test]
fn scenario_eof_inside_open_container_is_an_error() {
    let mut cursor = Cursor::new(SliceReader::new(br#"{"x":[1,2"#), JsonParserOptions::default());
    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert_eq!(cursor.pull().unwrap(), PullState::Map);
    assert_eq!(cursor.pull().unwrap(), PullState::List);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert!(cursor.pull().is_err());
}

/// Scenario #6: nesting beyond `stack_capacity` raises `StackOverflow` at
/// the offending byte.
#[test]
fn scenario_stack_overflow() {
    let options = JsonParserOptionsBuilder::default().with_stack_capacity(4).build();
    let data = b"[[[[[1]]]]]";
    let mut cursor = Cursor::new(SliceReader::new(data), options);
    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    for _ in 0..4 {
        assert_eq!(cursor.pull().unwrap(), PullState::List);
    }
    assert!(cursor.pull().is_err());
}

/// Scenario #7: an overlong two-byte encoding of NUL embedded in a string is
/// rejected. The whole 4-byte input fits in one buffer fill, so the scanner
/// reaches the offending `0xC0` lead byte during the same `pull` that would
/// otherwise report the string `Datum` — fail-fast means the error surfaces
/// right there, not later from `chunk_read`.
#[test]
fn scenario_overlong_utf8_in_string() {
    let data: &[u8] = &[b'"', 0xC0, 0x80, b'"'];
    let mut cursor = Cursor::new(SliceReader::new(data), JsonParserOptions::default());
    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert!(cursor.pull().is_err());
}

/// Scenario #8: an exponent magnitude beyond the cap is rejected.
#[test]
fn scenario_max_exponent_exceeded() {
    let mut cursor = Cursor::new(SliceReader::new(b"1e10000001"), JsonParserOptions::default());
    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert!(cursor.pull().is_err());
}

/// Fragment invariance: delivering the same document through every possible
/// split point, with a buffer far smaller than the document, must produce
/// the same sequence of events as a single whole-document delivery.
#[test]
fn fragment_invariance_across_every_split_point() {
    let documents: &[&[u8]] = &[
        br#"{"a":1,"b":[true,false,null,"hi"],"c":{"d":-1.5e10}}"#,
        br#""café 😀 plain \"escaped\"""#,
        br#"[1,2,3,4,5,6,7,8,9,10]"#,
        br#"{"unicode":"naïve А"}"#,
    ];

    for doc in documents {
        let whole = walk(doc);
        for split in 1..doc.len() {
            let reader = TrickleReader::new(doc, &[split]);
            let options = JsonParserOptionsBuilder::default().with_buffer_size(8).build();
            let mut cursor = Cursor::new(reader, options);
            let mut fragmented = Vec::new();
            loop {
                let state = cursor.pull().unwrap();
                fragmented.push(state);
                if state == PullState::NoData {
                    break;
                }
            }
            assert_eq!(
                fragmented,
                whole,
                "split at {split} diverged for {:?}",
                std::str::from_utf8(doc).unwrap()
            );
        }
    }
}

/// Streaming mode accepts a sequence of whitespace-separated top-level
/// values rather than exactly one, reading from a generic `std::io::Read`
/// via [`IoReader`].
#[test]
fn streaming_mode_over_an_io_reader() {
    let options = JsonParserOptionsBuilder::default().with_streaming(true).build();
    let source = std::io::Cursor::new(b"1 \"two\" [3]".to_vec());
    let mut cursor = Cursor::new(IoReader::new(source), options);

    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.get_uint(None).unwrap(), 1);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(drain_string(&mut cursor), "two");
    assert_eq!(cursor.pull().unwrap(), PullState::List);
    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.get_uint(None).unwrap(), 3);
    assert_eq!(cursor.pull().unwrap(), PullState::AscendList);
    assert_eq!(cursor.pull().unwrap(), PullState::NoData);
}

/// The eager key-set matcher reports `key_enum` without the caller ever
/// string-comparing the key.
#[test]
fn key_set_matching_end_to_end() {
    let keys = ["age", "height", "name"];
    let key_set = KeySet::new(&keys).unwrap();
    let data = br#"{"name":"Grace","age":36}"#;
    let options = JsonParserOptions::default();
    let mut cursor = Cursor::with_key_set(SliceReader::new(data), options, Some(&key_set));

    assert_eq!(cursor.pull().unwrap(), PullState::Begin);
    assert_eq!(cursor.pull().unwrap(), PullState::Map);

    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.key_enum(), 2); // "name"
    assert_eq!(drain_string(&mut cursor), "Grace");

    assert_eq!(cursor.pull().unwrap(), PullState::Datum);
    assert_eq!(cursor.key_enum(), 0); // "age"
    assert_eq!(cursor.get_uint(None).unwrap(), 36);
}

fn drain_string(cursor: &mut Cursor<impl Reader>) -> String {
    let mut out = Vec::new();
    let mut buf = [0u8; 4];
    loop {
        let n = cursor.chunk_read(&mut buf, None).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(out).unwrap()
}

/// A [`Reader`] that returns `schedule[0]` bytes on its first call and
/// whatever's left (still bounded by the destination buffer) afterwards,
/// used to pin down an exact, reproducible split point in a document.
struct TrickleReader<'a> {
    data: &'a [u8],
    pos: usize,
    first: Option<usize>,
}

impl<'a> TrickleReader<'a> {
    fn new(data: &'a [u8], schedule: &'a [usize]) -> Self {
        TrickleReader {
            data,
            pos: 0,
            first: schedule.first().copied(),
        }
    }
}

impl<'a> Reader for TrickleReader<'a> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, noajson::ReaderError> {
        let remaining = self.data.len() - self.pos;
        let want = self.first.take().unwrap_or(remaining);
        let n = want.min(buffer.len()).min(remaining);
        buffer[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
