//! # OxBzip Core
//!
//! Core components for the OxBzip bzip2 library.
//!
//! This crate provides the fundamental building blocks shared by the
//! compression and decompression engines:
//!
//! - [`bitstream`]: MSB-first bit packing/unpacking with byte-level
//!   suspension, the register discipline the streaming engines are built on
//! - [`crc`]: CRC-32 in the bzip2 parametrisation, plus the stream-level
//!   combined CRC fold
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! OxBzip is layered the same way the wire format is:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: CLI driver (oxbzip-cli)                             │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec (oxbzip)                                      │
//! │     RLE-1, BWT, MTF, multi-table Huffman, engines       │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: BitStream (this crate)                              │
//! │     BitReader/BitWriter, CRC-32                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitstream;
pub mod crc;
pub mod error;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use crc::{CombinedCrc, Crc32};
pub use error::{BzError, Result};
