//! Error types for OxBzip operations.
//!
//! This module provides the error taxonomy shared by the streaming engines,
//! the one-shot helpers, and the stdio adapters. Errors returned from a
//! `process` call are terminal for that stream: the caller may inspect the
//! error but cannot resume.

use std::io;
use thiserror::Error;

/// The main error type for OxBzip operations.
#[derive(Debug, Error)]
pub enum BzError {
    /// I/O error from an underlying reader/writer (stdio adapters only;
    /// the streaming engines never perform I/O).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Caller violated a precondition (out-of-range parameter, zero-length
    /// buffer where progress was required).
    #[error("Invalid parameter: {message}")]
    Param {
        /// Description of the violated precondition.
        message: String,
    },

    /// Action incompatible with the current stream mode (e.g. `Run` while
    /// flushing, or `avail_in` changed between two `Flush` calls).
    #[error("Invalid call sequence: {message}")]
    Sequence {
        /// Description of the sequencing violation.
        message: String,
    },

    /// Stream does not begin with the `BZh` signature, or the block-size
    /// digit is out of range.
    #[error("Not a bzip2 stream: expected {expected:02x?}, found {found:02x?}")]
    Magic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual bytes found.
        found: Vec<u8>,
    },

    /// Structurally valid but semantically invalid compressed data
    /// (bad table, bad origin pointer, symbol out of alphabet, ...).
    #[error("Corrupted bzip2 data: {message}")]
    Data {
        /// Description of the corruption.
        message: String,
    },

    /// CRC checksum mismatch (block or combined).
    #[error("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        /// CRC value stored in the stream.
        stored: u32,
        /// CRC value computed from the data.
        computed: u32,
    },

    /// Input ended in the middle of a stream.
    #[error("Unexpected end of bzip2 stream")]
    UnexpectedEof,

    /// A one-shot buffer-to-buffer call ran out of output space.
    #[error("Output buffer full: need more than {capacity} bytes")]
    OutputBufferFull {
        /// Capacity of the caller-supplied output buffer.
        capacity: usize,
    },
}

/// Result type alias for OxBzip operations.
pub type Result<T> = std::result::Result<T, BzError>;

impl BzError {
    /// Create a parameter error.
    pub fn param(message: impl Into<String>) -> Self {
        Self::Param {
            message: message.into(),
        }
    }

    /// Create a call-sequence error.
    pub fn sequence(message: impl Into<String>) -> Self {
        Self::Sequence {
            message: message.into(),
        }
    }

    /// Create a bad-magic error.
    pub fn magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::Magic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a corrupted-data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(stored: u32, computed: u32) -> Self {
        Self::CrcMismatch { stored, computed }
    }

    /// True for the errors that mean the compressed data itself is bad
    /// (as opposed to caller mistakes or I/O failures).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Magic { .. } | Self::Data { .. } | Self::CrcMismatch { .. } | Self::UnexpectedEof
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BzError::magic(vec![0x42, 0x5A, 0x68], vec![0x1F, 0x8B, 0x08]);
        assert!(err.to_string().contains("Not a bzip2 stream"));

        let err = BzError::crc_mismatch(0x12345678, 0xDEADBEEF);
        assert!(err.to_string().contains("CRC mismatch"));

        let err = BzError::sequence("Run after Flush");
        assert!(err.to_string().contains("Run after Flush"));
    }

    #[test]
    fn test_data_error_classification() {
        assert!(BzError::data("bad selector").is_data_error());
        assert!(BzError::UnexpectedEof.is_data_error());
        assert!(!BzError::param("blockSize100k out of range").is_data_error());
        assert!(!BzError::sequence("stream already finished").is_data_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: BzError = io_err.into();
        assert!(matches!(err, BzError::Io(_)));
        assert!(!err.is_data_error());
    }
}
