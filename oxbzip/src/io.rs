//! `std::io` adapters over the streaming engines.
//!
//! [`BzEncoder`] wraps any `Write` and compresses everything written
//! through it; call [`BzEncoder::finish`] to emit the stream trailer.
//! [`BzDecoder`] wraps any `Read` and yields decompressed bytes,
//! continuing transparently across concatenated streams the way the
//! command-line tool expects; trailing non-bzip2 garbage after a complete
//! stream is ignored.

use crate::compress::{Action, CompressStatus, Compressor};
use crate::decode::{DecompressStatus, Decompressor};
use crate::{BlockSize, Result};
use oxbzip_core::BzError;
use std::io::{self, Read, Write};

const BUFFER_SIZE: usize = 8192;

fn to_io_error(e: BzError) -> io::Error {
    match e {
        BzError::Io(inner) => inner,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}

/// A compressing writer.
pub struct BzEncoder<W: Write> {
    inner: W,
    engine: Compressor,
    buf: Vec<u8>,
}

impl<W: Write> BzEncoder<W> {
    /// Create an encoder writing a bzip2 stream to `inner`.
    pub fn new(inner: W, level: BlockSize) -> Result<Self> {
        Ok(Self {
            inner,
            engine: Compressor::new(level, 0)?,
            buf: vec![0u8; BUFFER_SIZE],
        })
    }

    /// Total raw bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.engine.total_in()
    }

    /// Total compressed bytes handed to the underlying writer so far.
    pub fn total_out(&self) -> u64 {
        self.engine.total_out()
    }

    /// Finish the stream (trailer included) and return the underlying
    /// writer.
    pub fn finish(mut self) -> Result<W> {
        loop {
            let (_, produced, status) = self.engine.process(&[], &mut self.buf, Action::Finish)?;
            self.inner.write_all(&self.buf[..produced])?;
            if status == CompressStatus::StreamEnd {
                self.inner.flush()?;
                return Ok(self.inner);
            }
        }
    }
}

impl<W: Write> Write for BzEncoder<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut fed = 0usize;
        while fed < data.len() {
            let (consumed, produced, _) = self
                .engine
                .process(&data[fed..], &mut self.buf, Action::Run)
                .map_err(to_io_error)?;
            fed += consumed;
            self.inner.write_all(&self.buf[..produced])?;
        }
        Ok(fed)
    }

    /// Flushes the underlying writer. This does *not* force out the data
    /// still buffered in the compression block; only `finish` (or the
    /// engine's Flush action) does that.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A decompressing reader.
pub struct BzDecoder<R: Read> {
    inner: R,
    engine: Decompressor,
    small: bool,
    in_buf: Vec<u8>,
    in_start: usize,
    in_end: usize,
    inner_eof: bool,
    streams_done: u32,
    done: bool,
}

impl<R: Read> BzDecoder<R> {
    /// Create a decoder reading one or more concatenated bzip2 streams
    /// from `inner`.
    pub fn new(inner: R) -> Self {
        Self::with_small(inner, false)
    }

    /// Like [`BzDecoder::new`], selecting the memory-saving inverse BWT.
    pub fn with_small(inner: R, small: bool) -> Self {
        Self {
            inner,
            engine: Decompressor::new(small),
            small,
            in_buf: vec![0u8; BUFFER_SIZE],
            in_start: 0,
            in_end: 0,
            inner_eof: false,
            streams_done: 0,
            done: false,
        }
    }

    /// Number of complete streams decoded so far.
    pub fn streams_done(&self) -> u32 {
        self.streams_done
    }

    /// Return the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&mut self) -> io::Result<()> {
        if self.in_start == self.in_end && !self.inner_eof {
            self.in_start = 0;
            self.in_end = self.inner.read(&mut self.in_buf)?;
            if self.in_end == 0 {
                self.inner_eof = true;
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for BzDecoder<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.done {
            return Ok(0);
        }
        loop {
            self.refill()?;
            let result = self
                .engine
                .process(&self.in_buf[self.in_start..self.in_end], out);
            let (consumed, produced, status) = match result {
                Ok(r) => r,
                // A later stream that does not start with the magic is
                // trailing garbage, which the file format tolerates.
                Err(BzError::Magic { .. }) if self.streams_done > 0 => {
                    self.done = true;
                    return Ok(0);
                }
                Err(e) => return Err(to_io_error(e)),
            };
            self.in_start += consumed;

            match status {
                DecompressStatus::StreamEnd => {
                    self.streams_done += 1;
                    self.engine = Decompressor::new(self.small);
                    if self.in_start == self.in_end {
                        self.refill()?;
                    }
                    if self.in_start == self.in_end && self.inner_eof {
                        self.done = true;
                    }
                    if produced > 0 || self.done {
                        return Ok(produced);
                    }
                }
                DecompressStatus::Ok => {
                    if produced > 0 {
                        return Ok(produced);
                    }
                    if self.inner_eof && self.in_start == self.in_end {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            BzError::UnexpectedEof.to_string(),
                        ));
                    }
                }
            }
        }
    }
}
