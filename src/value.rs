//! The fixed-width value record the byte state machine writes into the
//! caller-owned value array (`ParserState::values`).

/// Sentinel written into `Value::significand_val`'s code-point slot to mean
/// "no code-point fragment pending". Chosen so it can never collide with a
/// real Unicode scalar value (max `0x10FFFF`).
pub const EMPTY_CP: u32 = 0x8000_0000;

/// Index into a caller-supplied key set meaning "no entry matched".
///
/// Callers compare `Value::key_enum` against `key_set.len()` (passed back as
/// this constant when no key set was supplied) to detect "no match".
pub const NO_KEY_MATCH: u16 = u16::MAX;

/// The kind of a parsed value, encoded in the low 3 bits of `Value::kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A JSON number.
    Numeric = 0,
    /// One of `true`, `false`, `null`, `NaN`, `Infinity`.
    Special = 1,
    /// The `[` that starts an array.
    ArrayBegin = 2,
    /// The `{` that starts an object.
    ObjectBegin = 3,
    /// A JSON string (key or value).
    String = 4,
}

/// Significand encoding used for [`ValueKind::Special`] values, mirroring
/// the reserved-word handle used during recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    False = 0,
    True = 1,
    Null = 2,
    NaN = 3,
    Infinity = 4,
}

impl Special {
    pub(crate) fn from_u64(v: u64) -> Option<Self> {
        match v {
            0 => Some(Special::False),
            1 => Some(Special::True),
            2 => Some(Special::Null),
            3 => Some(Special::NaN),
            4 => Some(Special::Infinity),
            _ => None,
        }
    }
}

/// Flag bits stored alongside [`ValueKind`] in `Value::flags_byte`.
///
/// A single `u8` of packed flags doesn't warrant pulling in the `bitflags`
/// crate, so this is hand-rolled as a plain bit-packed newtype instead. Kept
/// in its own byte, separate from the kind, so a flag can never alias a kind
/// bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueFlags(u8);

impl ValueFlags {
    pub const NEGATIVE_SIGNIFICAND: ValueFlags = ValueFlags(0x01);
    pub const NEGATIVE_EXPONENT: ValueFlags = ValueFlags(0x02);
    pub const VAL_FRAGMENT: ValueFlags = ValueFlags(0x04);
    pub const KEY_FRAGMENT: ValueFlags = ValueFlags(0x08);
    /// Key completed, but value fragment not yet started.
    pub const MIDDLE: ValueFlags = ValueFlags(0x10);
    /// Significand accumulation saturated; see [`Value::significand_overflowed`].
    pub const SIGNIFICAND_OVERFLOW: ValueFlags = ValueFlags(0x20);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u8) -> Self {
        ValueFlags(bits)
    }

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// The record the scanner writes for each completed (or fragmented) JSON
/// value. All fields are fixed-width; nothing here allocates.
#[derive(Debug, Clone, Copy)]
pub struct Value {
    /// The value's [`ValueKind`], as its `u8` discriminant.
    pub(crate) kind_byte: u8,
    /// [`ValueFlags`] bits, kept in a byte of its own so a flag set on a
    /// fragment survives an unrelated `set_kind` call (and vice versa).
    pub(crate) flags_byte: u8,

    /// Byte extent of the most recent key within the current input buffer.
    /// No key may be longer than 255 bytes.
    pub key_length: u8,

    /// Index into the caller's sorted key set, or `NO_KEY_MATCH`.
    pub key_enum: u16,

    /// Key begins at this offset from the buffer passed to the current
    /// `parse` call.
    pub key_offset: u32,

    /// String value begins at this offset from the buffer passed to the
    /// current `parse` call.
    pub strval_offset: u32,

    /// Count of code points in `[0, 0x80)`.
    pub cp1_count: u32,
    /// Count of code points in `[0x80, 0x800)`.
    pub cp2_count: u32,
    /// Count of code points in `[0x800, 0x10000)`.
    pub cp3_count: u32,

    /// For numerics: signed decimal exponent. For strings: count of code
    /// points in `[0x10000, 0x110000)`.
    pub exp_val: i32,

    /// For numerics: unsigned integer significand. For specials: a
    /// [`Special`] discriminant. For strings: a leading code-point fragment
    /// (or [`EMPTY_CP`]).
    pub significand_val: u64,
}

impl Default for Value {
    fn default() -> Self {
        Value {
            kind_byte: ValueKind::Numeric as u8,
            flags_byte: 0,
            key_length: 0,
            key_enum: NO_KEY_MATCH,
            key_offset: 0,
            strval_offset: 0,
            cp1_count: 0,
            cp2_count: 0,
            cp3_count: 0,
            exp_val: 0,
            significand_val: 0,
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self.kind_byte {
            0 => ValueKind::Numeric,
            1 => ValueKind::Special,
            2 => ValueKind::ArrayBegin,
            3 => ValueKind::ObjectBegin,
            _ => ValueKind::String,
        }
    }

    pub(crate) fn set_kind(&mut self, kind: ValueKind) {
        self.kind_byte = kind as u8;
    }

    pub(crate) fn flags(&self) -> ValueFlags {
        ValueFlags::from_bits_truncate(self.flags_byte)
    }

    pub(crate) fn set_flag(&mut self, flag: ValueFlags) {
        self.flags_byte |= flag.bits();
    }

    pub(crate) fn clear_flag(&mut self, flag: ValueFlags) {
        self.flags_byte &= !flag.bits();
    }

    pub fn is_negative_significand(&self) -> bool {
        self.flags().contains(ValueFlags::NEGATIVE_SIGNIFICAND)
    }

    pub fn is_negative_exponent(&self) -> bool {
        self.flags().contains(ValueFlags::NEGATIVE_EXPONENT)
    }

    /// `true` if the string/value is incomplete: more `parse` calls are
    /// needed before this value (or key) can be fully reported.
    pub fn is_fragment(&self) -> bool {
        self.flags().contains(ValueFlags::VAL_FRAGMENT)
            || self.flags().contains(ValueFlags::KEY_FRAGMENT)
            || self.flags().contains(ValueFlags::MIDDLE)
    }

    pub fn is_val_fragment(&self) -> bool {
        self.flags().contains(ValueFlags::VAL_FRAGMENT)
    }

    pub fn is_key_fragment(&self) -> bool {
        self.flags().contains(ValueFlags::KEY_FRAGMENT)
    }

    pub fn is_middle(&self) -> bool {
        self.flags().contains(ValueFlags::MIDDLE)
    }

    /// `true` if significand accumulation saturated at `u64::MAX`. See the
    /// significand-overflow design note.
    pub fn significand_overflowed(&self) -> bool {
        self.flags().contains(ValueFlags::SIGNIFICAND_OVERFLOW)
    }

    /// Total code-point count of a string value:
    /// `cp1 + cp2 + cp3 + exp_val` (exp_val co-opted to count 4-byte code
    /// points for strings).
    pub fn cp_count(&self) -> u32 {
        self.cp1_count + self.cp2_count + self.cp3_count + self.exp_val as u32
    }

    /// Total UTF-8 byte length of a string value.
    pub fn utf8_len(&self) -> u32 {
        self.cp1_count + 2 * self.cp2_count + 3 * self.cp3_count + 4 * self.exp_val as u32
    }

    pub(crate) fn special(&self) -> Option<Special> {
        Special::from_u64(self.significand_val)
    }
}
