//! bzip2 compression and decompression, pure Rust.
//!
//! The codec is organised as two independent streaming engines sharing the
//! bitstream wire format and CRC machinery from `oxbzip-core`:
//!
//! 1. Run-Length Encoding (RLE-1) - caps byte runs before sorting
//! 2. Burrows-Wheeler Transform (BWT) - block sorting for better compression
//! 3. Move-to-Front Transform (MTF) - locality transformation
//! 4. Zero-Run Length Encoding (RUNA/RUNB) - bijective coding of zero runs
//! 5. Multi-table Huffman Coding - final entropy coding, up to 6 tables
//!
//! The [`Compressor`] and [`Decompressor`] engines process caller-supplied
//! buffers and may suspend at any byte boundary; [`BzEncoder`]/[`BzDecoder`]
//! wrap them behind `std::io::Write`/`std::io::Read`, and [`compress`]/
//! [`decompress`] are one-shot conveniences.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Burrows-Wheeler block sort.
pub mod bwt;
mod compress;
mod decode;
mod huffman;
mod io;
mod mtf;
mod rand;
mod rle;

pub use compress::{Action, CompressStatus, Compressor, compress, compress_into};
pub use decode::{DecompressStatus, Decompressor, decompress, decompress_into};
pub use io::{BzDecoder, BzEncoder};
pub use oxbzip_core::{BzError, Result};

/// Stream header magic bytes ("BZh").
pub const STREAM_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];

/// Block header magic bytes (0x314159265359).
pub const BLOCK_MAGIC: [u8; 6] = [0x31, 0x41, 0x59, 0x26, 0x53, 0x59];

/// End of stream magic bytes (0x177245385090).
pub const EOS_MAGIC: [u8; 6] = [0x17, 0x72, 0x45, 0x38, 0x50, 0x90];

/// Maximum block size (900k, level 9).
pub const MAX_BLOCK_SIZE: usize = 900_000;

/// Work factor used when the caller passes 0.
pub const DEFAULT_WORK_FACTOR: u32 = 30;

/// Alphabet ceiling: 256 byte values + RUNA/RUNB collapsed with EOB.
pub(crate) const MAX_ALPHA_SIZE: usize = 258;

/// Decoder-side ceiling on Huffman code lengths (pre-1.0.3 encoders
/// produced up to 20 bits; the encoder here never exceeds 17).
pub(crate) const MAX_CODE_LEN: usize = 23;

/// Zero-run symbols of the post-MTF alphabet.
pub(crate) const RUNA: i32 = 0;
/// Second zero-run symbol.
pub(crate) const RUNB: i32 = 1;

/// Maximum number of Huffman coding tables per block.
pub(crate) const N_GROUPS: usize = 6;
/// Symbols covered by one selector.
pub(crate) const G_SIZE: usize = 50;
/// Refinement iterations over the coding tables.
pub(crate) const N_ITERS: usize = 4;
/// Upper bound on the selector count of a block.
pub(crate) const MAX_SELECTORS: usize = 2 + MAX_BLOCK_SIZE / G_SIZE;

/// Compression level (1-9); the nominal block capacity is
/// `100000 * level` bytes of run-length-encoded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize(u8);

impl BlockSize {
    /// Create a new block size from a level in `1..=9`.
    pub fn new(level: u8) -> Result<Self> {
        if (1..=9).contains(&level) {
            Ok(Self(level))
        } else {
            Err(BzError::param(format!(
                "blockSize100k must be 1..=9, got {level}"
            )))
        }
    }

    /// Nominal block capacity in bytes for this level.
    pub fn block_size(&self) -> usize {
        self.0 as usize * 100_000
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self(9)
    }
}
