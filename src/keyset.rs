//! Binary-search key-set narrowing against an incoming key character stream.
//!
//! The caller supplies a lexicographically sorted slice of ASCII key names.
//! While a key is being consumed byte by byte, [`KeySet::narrow`] maintains
//! the half-open range `[low, sup)` of entries still consistent with the
//! prefix read so far, narrowing both ends with one binary search apiece.

use crate::value::NO_KEY_MATCH;

/// A sorted set of ASCII key names the parser can eagerly match against
/// while scanning an object key, producing a `key_enum` index instead of
/// requiring the caller to string-compare after the fact.
pub struct KeySet<'a> {
    keys: &'a [&'a str],
}

/// Raised by [`KeySet::new`] when an entry contains a non-ASCII byte.
///
/// See the "non-ASCII keys" design note: the scanner matches keys on raw
/// bytes, never decoded code points, so the safe contract is that key-set
/// entries must be ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonAsciiKeyError;

impl<'a> KeySet<'a> {
    /// Build a key set from a lexicographically sorted slice of ASCII keys.
    /// `keys` is assumed to already be sorted; this is a precondition, not
    /// something the constructor re-verifies (the caller typically builds
    /// it once from a `const` array at startup).
    pub fn new(keys: &'a [&'a str]) -> Result<Self, NonAsciiKeyError> {
        for k in keys {
            if !k.is_ascii() {
                return Err(NonAsciiKeyError);
            }
        }
        Ok(KeySet { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&'a str> {
        self.keys.get(index as usize).copied()
    }
}

/// Narrowing state carried in `ParserState` while a key is being scanned.
/// `low` is the matcher's current eager guess at `key_enum`; `sup` is the
/// open upper bound. Both are indices into the owning `KeySet`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KeyMatch {
    pub low: u16,
    pub sup: u16,
}

impl KeyMatch {
    /// Start matching a new key: the whole key set is in range.
    pub fn start(key_set: &KeySet) -> Self {
        KeyMatch {
            low: 0,
            sup: key_set.len() as u16,
        }
    }

    /// Byte at `pos` in `key`, or the sentinel `0` past its end — the same
    /// trick a null-terminated C string gets for free, letting a key that's
    /// a strict prefix of another compare as "smaller" instead of panicking
    /// out of bounds. Real key bytes are never `0` (a literal NUL in a JSON
    /// key string can only appear as the six-byte escape ` `, since key
    /// bytes are matched raw, before escape decoding), so there's no
    /// ambiguity with an actual input byte.
    fn byte_at(key: &str, pos: usize) -> u8 {
        key.as_bytes().get(pos).copied().unwrap_or(0)
    }

    /// Narrow the range given that the `pos`-th byte of the key (0-indexed)
    /// is `byte`. Idempotent when `byte` already matches both range
    /// endpoints at `pos` (the fast path: most real-world key sets agree on
    /// a long common prefix, e.g. all starting with the same letter).
    ///
    /// Note this narrows towards the keys consistent with the prefix read so
    /// far; it does not, by itself, guarantee a unique match once the key
    /// ends — if one key is a strict prefix of another (`"a"` and `"ab"`),
    /// the range may still contain more than one entry when [`finish`] is
    /// called. [`finish`] then reports the lowest surviving entry, exactly
    /// as the C ancestor does.
    pub fn narrow(&mut self, key_set: &KeySet, pos: usize, byte: u8) {
        if self.low >= self.sup {
            // Range already empty; nothing left to narrow.
            return;
        }

        let low_matches = Self::byte_at(key_set.keys[self.low as usize], pos) == byte;
        let high_matches = Self::byte_at(key_set.keys[self.sup as usize - 1], pos) == byte;
        if low_matches && high_matches {
            return;
        }

        if !low_matches {
            // Binary search for the least index whose byte at `pos` is >= `byte`.
            let mut lo = self.low;
            let mut hi = self.sup;
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if Self::byte_at(key_set.keys[mid as usize], pos) < byte {
                    lo = mid + 1;
                } else {
                    hi = mid;
                }
            }
            self.low = lo;
            if self.low >= self.sup {
                return;
            }
        }

        if !high_matches {
            // Binary search for the least index whose byte at `pos` is > `byte`.
            let mut lo = self.low;
            let mut hi = self.sup;
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if Self::byte_at(key_set.keys[mid as usize], pos) <= byte {
                    lo = mid + 1;
                } else {
                    hi = mid;
                }
            }
            self.sup = lo;
        }
    }

    /// Finalize the match once the key has ended: `NO_KEY_MATCH` if no key
    /// survived narrowing, otherwise the lowest surviving entry's index —
    /// but only if that entry's length equals `key_length`. Narrowing alone
    /// only rules out keys that *disagree* with a prefix; it can't tell a
    /// strict prefix of a surviving candidate (`"nam"` against a set
    /// containing `"name"`) from a real match, since every byte fed so far
    /// agreed. The length check catches that case.
    pub fn finish(&self, key_set: &KeySet, key_length: usize) -> u16 {
        if self.low >= self.sup {
            return NO_KEY_MATCH;
        }
        match key_set.keys.get(self.low as usize) {
            Some(candidate) if candidate.len() == key_length => self.low,
            _ => NO_KEY_MATCH,
        }
    }
}
