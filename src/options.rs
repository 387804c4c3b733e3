//! Configuration knobs shared by both layers.

/// Default number of container levels a [`crate::stack::ParseStack`] can
/// hold.
pub const DEFAULT_STACK_CAPACITY: usize = 2048;

/// Default number of [`crate::value::Value`] slots a `ParserState` batches
/// before it must be drained.
pub const DEFAULT_VALUES_CAPACITY: usize = 4;

/// Default size, in bytes, of the [`crate::cursor::Cursor`]'s input buffer.
/// This bounds the largest key or non-string scalar the cursor can hold
/// without returning a `BufferTooSmall` error.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Options controlling both the byte state machine and the pull cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonParserOptions {
    pub(crate) stack_capacity: usize,
    pub(crate) values_capacity: usize,
    pub(crate) buffer_size: usize,
    pub(crate) streaming: bool,
}

impl Default for JsonParserOptions {
    fn default() -> Self {
        JsonParserOptions {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            values_capacity: DEFAULT_VALUES_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            streaming: false,
        }
    }
}

impl JsonParserOptions {
    pub fn stack_capacity(&self) -> usize {
        self.stack_capacity
    }

    pub fn values_capacity(&self) -> usize {
        self.values_capacity
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// `true` if streaming mode is enabled, allowing a stream of multiple
    /// top-level JSON values separated by whitespace or self-delineating
    /// tokens.
    pub fn streaming(&self) -> bool {
        self.streaming
    }
}

/// A builder for [`JsonParserOptions`].
///
/// ```rust
/// use noajson::options::JsonParserOptionsBuilder;
///
/// let options = JsonParserOptionsBuilder::default()
///     .with_stack_capacity(16)
///     .with_values_capacity(8)
///     .build();
/// assert_eq!(options.stack_capacity(), 16);
/// ```
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonParserOptionsBuilder {
    options: JsonParserOptions,
}

impl JsonParserOptionsBuilder {
    /// Set the maximum container nesting depth. Exceeding it during parsing
    /// raises [`crate::error::ParserError::StackOverflow`].
    pub fn with_stack_capacity(mut self, stack_capacity: usize) -> Self {
        self.options.stack_capacity = stack_capacity;
        self
    }

    /// Set how many [`crate::value::Value`] slots the scanner batches before
    /// it must hand control back to the caller (or invoke the completion
    /// callback).
    pub fn with_values_capacity(mut self, values_capacity: usize) -> Self {
        self.options.values_capacity = values_capacity;
        self
    }

    /// Set the size, in bytes, of the cursor's input buffer. This bounds the
    /// largest key or non-string scalar the cursor can hold contiguously.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.options.buffer_size = buffer_size;
        self
    }

    /// Enable streaming mode: allow a stream of multiple top-level JSON
    /// values, each self-delineating (object, array, string) or separated by
    /// whitespace.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.options.streaming = streaming;
        self
    }

    pub fn build(self) -> JsonParserOptions {
        self.options
    }
}
