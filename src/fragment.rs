//! Fragment compaction: shifting an in-progress key or non-string scalar's
//! raw bytes to the front of the buffer before a refill, so that the next
//! `parse` call sees it as a contiguous prefix of the newly filled buffer.
//!
//! Only two kinds of
//! in-progress data ever need it: an object key (whose raw bytes the
//! key-set matcher and `get_key` need contiguous) and a non-string scalar
//! (a number or reserved word, which must never be reported to the caller
//! half-formed). A string *value* fragment does not need this: `chunk_read`
//! re-derives its content straight out of `Cursor::buffer`, so a refill only
//! has to keep the bytes from the string's still-undecoded position onward
//! (see the `carry` parameter of `Cursor::drive_raw`) rather than bulk-copy
//! anything out of it first.

/// Shift `buffer[keep_from..length]` down to `buffer[0..]`, returning the
/// number of bytes kept. The caller is expected to then refill
/// `buffer[new_length..]` via its [`crate::reader::Reader`] and adjust any
/// offsets it tracks (they must all become relative to `keep_from`).
pub(crate) fn fragcompact(buffer: &mut [u8], length: usize, keep_from: usize) -> usize {
    debug_assert!(keep_from <= length);
    debug_assert!(length <= buffer.len());
    let kept = length - keep_from;
    if keep_from != 0 && kept != 0 {
        buffer.copy_within(keep_from..length, 0);
    }
    kept
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shifts_tail_to_front() {
        let mut buf = *b"xxxxabcd";
        let kept = fragcompact(&mut buf, 8, 4);
        assert_eq!(kept, 4);
        assert_eq!(&buf[..4], b"abcd");
    }

    #[test]
    fn no_op_when_already_at_front() {
        let mut buf = *b"abcdxxxx";
        let kept = fragcompact(&mut buf, 4, 0);
        assert_eq!(kept, 4);
        assert_eq!(&buf[..4], b"abcd");
    }

    #[test]
    fn empty_keep_range() {
        let mut buf = *b"xxxxxxxx";
        let kept = fragcompact(&mut buf, 4, 4);
        assert_eq!(kept, 0);
    }
}
