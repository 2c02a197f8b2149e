//! Decode errors

use thiserror::Error;

/// Errors that abort decoding of a bytecode dump.
///
/// Unknown opcodes and unknown flag bits are not errors: they decode to
/// sentinel values and are rendered as such by the disassembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The first three bytes are not `ESC 'L' 'J'`
    #[error("invalid magic bytes {found:02x?}")]
    Format {
        /// Bytes found where the magic was expected
        found: [u8; 3],
    },

    /// The buffer ended in the middle of a read
    #[error("unexpected end of input at offset {offset} ({needed} more byte(s) needed)")]
    TruncatedInput {
        /// Absolute offset of the failed read
        offset: usize,
        /// Bytes missing to complete the read
        needed: usize,
    },

    /// The prototype nesting could not be reconstructed
    #[error("unresolved child prototype: {0}")]
    UnresolvedChild(ResolveFault),

    /// A prototype body did not consume exactly its length prefix
    #[error("prototype at offset {offset} declares {declared} byte(s) but {consumed} were decoded")]
    BodyLength {
        /// Absolute offset of the body's first byte
        offset: usize,
        /// Length taken from the prefix
        declared: usize,
        /// Bytes actually consumed by the body fields
        consumed: usize,
    },
}

/// Why the resolution stack could not produce a consistent tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveFault {
    /// A child constant was read while no decoded prototype was pending
    #[error("child constant at offset {offset} has no pending prototype")]
    EmptyStack {
        /// Absolute offset of the child constant's tag
        offset: usize,
    },

    /// The container ended with a number of pending prototypes other than one
    #[error("{count} prototype(s) pending at end of container, expected exactly 1")]
    Unclaimed {
        /// Pending prototypes left on the stack
        count: usize,
    },
}

/// Result type for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;
