//! The streaming compressor engine.
//!
//! Input bytes are run-length pre-encoded into a block workspace; when the
//! block fills (or the caller requests Flush/Finish) it goes through the
//! sort → MTF → Huffman pipeline and the packed bitstream is drained into
//! the caller's output buffer. The engine suspends whenever input runs out
//! or output fills, and resumes exactly where it left off.

use crate::rle::Rle1Block;
use crate::{
    BLOCK_MAGIC, BlockSize, DEFAULT_WORK_FACTOR, EOS_MAGIC, G_SIZE, MAX_ALPHA_SIZE, MAX_SELECTORS,
    N_GROUPS, N_ITERS, bwt, huffman, mtf,
};
use oxbzip_core::{BitWriter, BzError, CombinedCrc, Result};

/// What the caller wants a `process` call to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Consume input, producing output as blocks fill up.
    Run,
    /// Force out everything received so far, then continue the stream.
    Flush,
    /// Force out everything and terminate the stream.
    Finish,
}

/// Result code of a compression `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// Normal progress under `Run` (also: a completed `Flush`).
    RunOk,
    /// Flush still in progress; call again with `Flush`.
    FlushOk,
    /// Finish still in progress; call again with `Finish`.
    FinishOk,
    /// The stream is complete; only `total_in`/`total_out` remain valid.
    StreamEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Running,
    Flushing,
    Finishing,
}

/// The streaming bzip2 compressor.
///
/// Lifecycle: construct, then `process` with [`Action::Run`] until the data
/// is fed, optionally [`Action::Flush`], and finally [`Action::Finish`]
/// until [`CompressStatus::StreamEnd`].
pub struct Compressor {
    mode: Mode,
    /// True while filling the block, false while draining its bitstream.
    reading_input: bool,
    /// Input remaining at the moment Flush/Finish was requested; the caller
    /// must not feed more after that.
    avail_in_expect: u64,
    level: BlockSize,
    work_factor: u32,
    block: Rle1Block,
    writer: BitWriter,
    state_out_pos: usize,
    combined: CombinedCrc,
    block_no: u32,
    total_in: u64,
    total_out: u64,
}

impl Compressor {
    /// Create a compressor for the given block size.
    ///
    /// `work_factor` (0..=250, 0 meaning the default of 30) tunes how long
    /// the block sort persists with its fast path on repetitive data.
    pub fn new(level: BlockSize, work_factor: u32) -> Result<Self> {
        if work_factor > 250 {
            return Err(BzError::param(format!(
                "workFactor must be 0..=250, got {work_factor}"
            )));
        }
        let work_factor = if work_factor == 0 {
            DEFAULT_WORK_FACTOR
        } else {
            work_factor
        };
        // 19 bytes of headroom keep the final RLE run from overshooting.
        let capacity = level.block_size() - 19;
        let mut c = Self {
            mode: Mode::Running,
            reading_input: true,
            avail_in_expect: 0,
            level,
            work_factor,
            block: Rle1Block::new(capacity),
            writer: BitWriter::new(),
            state_out_pos: 0,
            combined: CombinedCrc::new(),
            block_no: 0,
            total_in: 0,
            total_out: 0,
        };
        c.prepare_new_block();
        Ok(c)
    }

    /// Total raw bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Advance the stream: consume from `input`, produce into `output`.
    ///
    /// Returns `(consumed, produced, status)`. The legal action sequence is
    /// `Run* Flush* Finish*`; within a Flush or Finish the unconsumed input
    /// length must stay what it was when the action was first requested, or
    /// the call fails with a sequence error.
    ///
    /// A `Run` call that can make no progress at all (no input to consume,
    /// no pending output to drain) fails with a parameter error rather than
    /// spinning; the stream itself stays valid.
    pub fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, CompressStatus)> {
        let mut in_pos = 0usize;
        let mut out_pos = 0usize;

        loop {
            match self.mode {
                Mode::Idle => return Err(BzError::sequence("stream already finished")),

                Mode::Running => match action {
                    Action::Run => {
                        let progress = self.handle(input, &mut in_pos, output, &mut out_pos);
                        return if progress {
                            Ok((in_pos, out_pos, CompressStatus::RunOk))
                        } else {
                            Err(BzError::param("no input to consume and no output pending"))
                        };
                    }
                    Action::Flush => {
                        self.avail_in_expect = input.len() as u64;
                        self.mode = Mode::Flushing;
                    }
                    Action::Finish => {
                        self.avail_in_expect = input.len() as u64;
                        self.mode = Mode::Finishing;
                    }
                },

                Mode::Flushing => {
                    if action != Action::Flush {
                        return Err(BzError::sequence("expected Flush to continue flushing"));
                    }
                    if self.avail_in_expect != (input.len() - in_pos) as u64 {
                        return Err(BzError::sequence("input length changed during flush"));
                    }
                    self.handle(input, &mut in_pos, output, &mut out_pos);
                    if self.avail_in_expect > 0
                        || !self.block.run_is_empty()
                        || self.state_out_pos < self.writer.len()
                    {
                        return Ok((in_pos, out_pos, CompressStatus::FlushOk));
                    }
                    self.mode = Mode::Running;
                    return Ok((in_pos, out_pos, CompressStatus::RunOk));
                }

                Mode::Finishing => {
                    if action != Action::Finish {
                        return Err(BzError::sequence("expected Finish to continue finishing"));
                    }
                    if self.avail_in_expect != (input.len() - in_pos) as u64 {
                        return Err(BzError::sequence("input length changed during finish"));
                    }
                    let progress = self.handle(input, &mut in_pos, output, &mut out_pos);
                    if !progress {
                        return Err(BzError::sequence(
                            "no progress possible; output buffer required",
                        ));
                    }
                    if self.avail_in_expect > 0
                        || !self.block.run_is_empty()
                        || self.state_out_pos < self.writer.len()
                    {
                        return Ok((in_pos, out_pos, CompressStatus::FinishOk));
                    }
                    self.mode = Mode::Idle;
                    return Ok((in_pos, out_pos, CompressStatus::StreamEnd));
                }
            }
        }
    }

    /// The input/output micro-step loop shared by all actions.
    fn handle(
        &mut self,
        input: &[u8],
        in_pos: &mut usize,
        output: &mut [u8],
        out_pos: &mut usize,
    ) -> bool {
        let mut progress_in = false;
        let mut progress_out = false;

        loop {
            if !self.reading_input {
                progress_out |= self.copy_output(output, out_pos);
                if self.state_out_pos < self.writer.len() {
                    break;
                }
                if self.mode == Mode::Finishing
                    && self.avail_in_expect == 0
                    && self.block.run_is_empty()
                {
                    break;
                }
                self.prepare_new_block();
                self.reading_input = true;
                if self.mode == Mode::Flushing
                    && self.avail_in_expect == 0
                    && self.block.run_is_empty()
                {
                    break;
                }
            }

            if self.reading_input {
                progress_in |= self.copy_input(input, in_pos);
                if self.mode != Mode::Running && self.avail_in_expect == 0 {
                    self.block.flush_run();
                    self.compress_block(self.mode == Mode::Finishing);
                    self.reading_input = false;
                } else if self.block.is_full() {
                    self.compress_block(false);
                    self.reading_input = false;
                } else if *in_pos >= input.len() {
                    break;
                }
            }
        }

        progress_in || progress_out
    }

    fn copy_input(&mut self, input: &[u8], in_pos: &mut usize) -> bool {
        let mut progress = false;
        if self.mode == Mode::Running {
            while !self.block.is_full() && *in_pos < input.len() {
                self.block.add_byte(input[*in_pos]);
                *in_pos += 1;
                self.total_in += 1;
                progress = true;
            }
        } else {
            while !self.block.is_full() && *in_pos < input.len() && self.avail_in_expect > 0 {
                self.block.add_byte(input[*in_pos]);
                *in_pos += 1;
                self.total_in += 1;
                self.avail_in_expect -= 1;
                progress = true;
            }
        }
        progress
    }

    fn copy_output(&mut self, output: &mut [u8], out_pos: &mut usize) -> bool {
        let mut progress = false;
        while *out_pos < output.len() && self.state_out_pos < self.writer.len() {
            output[*out_pos] = self.writer.bytes()[self.state_out_pos];
            self.state_out_pos += 1;
            *out_pos += 1;
            self.total_out += 1;
            progress = true;
        }
        progress
    }

    fn prepare_new_block(&mut self) {
        self.block.reset();
        self.writer.clear();
        self.state_out_pos = 0;
        self.block_no += 1;
    }

    /// Run the block through sort → MTF → Huffman and emit it, preceded by
    /// the stream header for the first block and followed by the trailer
    /// when this is the last.
    fn compress_block(&mut self, is_last_block: bool) {
        let sorted = if !self.block.is_empty() {
            let block_crc = self.block.crc_value();
            self.combined.fold(block_crc);
            let (ptr, orig_ptr) = bwt::sort_block(self.block.data(), self.work_factor);
            Some((ptr, orig_ptr, block_crc))
        } else {
            None
        };

        if self.block_no == 1 {
            self.writer.write_byte(b'B');
            self.writer.write_byte(b'Z');
            self.writer.write_byte(b'h');
            self.writer.write_byte(b'0' + self.level.level());
        }

        if let Some((ptr, orig_ptr, block_crc)) = sorted {
            for &b in &BLOCK_MAGIC {
                self.writer.write_byte(b);
            }
            self.writer.write_u32(block_crc);
            // Randomised bit: the sort guarantees termination, so never set.
            self.writer.write_bits(0, 1);
            self.writer.write_bits(orig_ptr, 24);

            let encoded = mtf::encode_block(self.block.data(), &ptr, &self.block.in_use);
            send_mtf_values(&mut self.writer, &encoded, &self.block.in_use);
        }

        if is_last_block {
            for &b in &EOS_MAGIC {
                self.writer.write_byte(b);
            }
            self.writer.write_u32(self.combined.value());
            self.writer.finish();
        }
    }
}

const LESSER_COST: u8 = 0;
const GREATER_COST: u8 = 15;

/// Emit the mapping table, selectors, coding tables and the symbol stream
/// for one block.
fn send_mtf_values(w: &mut BitWriter, m: &mtf::MtfEncoded, in_use: &[bool; 256]) {
    let alpha_size = m.alpha_size;
    let n_mtf = m.mtfv.len();
    let mtfv = &m.mtfv;

    let mut len = [[GREATER_COST; MAX_ALPHA_SIZE]; N_GROUPS];

    let n_groups = match n_mtf {
        0..200 => 2,
        200..600 => 3,
        600..1200 => 4,
        1200..2400 => 5,
        _ => 6,
    };

    // Generate an initial set of coding tables by splitting the frequency
    // histogram into roughly equal-cost slabs, one table favouring each.
    {
        let mut n_part = n_groups as i32;
        let mut rem_f = n_mtf as i32;
        let mut gs = 0i32;
        while n_part > 0 {
            let t_freq = rem_f / n_part;
            let mut ge = gs - 1;
            let mut a_freq = 0i32;
            while a_freq < t_freq && ge < alpha_size as i32 - 1 {
                ge += 1;
                a_freq += m.freq[ge as usize];
            }
            if ge > gs
                && n_part != n_groups as i32
                && n_part != 1
                && (n_groups as i32 - n_part) % 2 == 1
            {
                a_freq -= m.freq[ge as usize];
                ge -= 1;
            }
            let t = (n_part - 1) as usize;
            for (v, slot) in len[t][..alpha_size].iter_mut().enumerate() {
                *slot = if (v as i32) >= gs && (v as i32) <= ge {
                    LESSER_COST
                } else {
                    GREATER_COST
                };
            }
            n_part -= 1;
            gs = ge + 1;
            rem_f -= a_freq;
        }
    }

    // Iterate: score each 50-symbol group against every table, pick the
    // cheapest, then rebuild each table from the frequencies it won.
    let mut selector: Vec<u8> = Vec::with_capacity(n_mtf / G_SIZE + 1);
    let mut rfreq = [[0i32; MAX_ALPHA_SIZE]; N_GROUPS];

    for _ in 0..N_ITERS {
        for t in rfreq.iter_mut().take(n_groups) {
            *t = [0; MAX_ALPHA_SIZE];
        }
        selector.clear();

        let mut gs = 0usize;
        while gs < n_mtf {
            let ge = (gs + G_SIZE - 1).min(n_mtf - 1);

            let mut cost = [0u32; N_GROUPS];
            for &sym in &mtfv[gs..=ge] {
                for (t, c) in cost.iter_mut().enumerate().take(n_groups) {
                    *c += len[t][sym as usize] as u32;
                }
            }

            let mut bt = 0usize;
            let mut bc = u32::MAX;
            for (t, &c) in cost.iter().enumerate().take(n_groups) {
                if c < bc {
                    bc = c;
                    bt = t;
                }
            }
            selector.push(bt as u8);

            for &sym in &mtfv[gs..=ge] {
                rfreq[bt][sym as usize] += 1;
            }
            gs = ge + 1;
        }

        for t in 0..n_groups {
            huffman::make_code_lengths(&mut len[t], &rfreq[t], alpha_size, 17);
        }
    }
    let n_selectors = selector.len();
    debug_assert!(n_selectors <= MAX_SELECTORS);

    // MTF-code the selector sequence itself.
    let mut selector_mtf = vec![0u8; n_selectors];
    {
        let mut pos: [u8; N_GROUPS] = [0, 1, 2, 3, 4, 5];
        for (i, &ll_i) in selector.iter().enumerate() {
            let mut j = 0usize;
            let mut tmp = pos[j];
            while ll_i != tmp {
                j += 1;
                let tmp2 = tmp;
                tmp = pos[j];
                pos[j] = tmp2;
            }
            pos[0] = tmp;
            selector_mtf[i] = j as u8;
        }
    }

    // Assign the actual canonical codes.
    let mut code = [[0i32; MAX_ALPHA_SIZE]; N_GROUPS];
    for t in 0..n_groups {
        let mut min_len = 32i32;
        let mut max_len = 0i32;
        for &l in &len[t][..alpha_size] {
            max_len = max_len.max(l as i32);
            min_len = min_len.min(l as i32);
        }
        huffman::assign_codes(&mut code[t], &len[t], min_len, max_len, alpha_size);
    }

    // Mapping table: 16 bucket-presence bits, then 16 bits per set bucket.
    {
        let mut in_use16 = [false; 16];
        for i in 0..16 {
            for j in 0..16 {
                if in_use[i * 16 + j] {
                    in_use16[i] = true;
                }
            }
        }
        for &used in &in_use16 {
            w.write_bits(u32::from(used), 1);
        }
        for i in 0..16 {
            if in_use16[i] {
                for j in 0..16 {
                    w.write_bits(u32::from(in_use[i * 16 + j]), 1);
                }
            }
        }
    }

    // Selectors, unary-coded through their own MTF.
    w.write_bits(n_groups as u32, 3);
    w.write_bits(n_selectors as u32, 15);
    for &s in &selector_mtf {
        for _ in 0..s {
            w.write_bits(1, 1);
        }
        w.write_bits(0, 1);
    }

    // Coding tables: 5-bit start, then per symbol 10/11 adjustments and a
    // 0 commit bit.
    for t in 0..n_groups {
        let mut curr = len[t][0] as i32;
        w.write_bits(curr as u32, 5);
        for &l in &len[t][..alpha_size] {
            let target = l as i32;
            while curr < target {
                w.write_bits(2, 2);
                curr += 1;
            }
            while curr > target {
                w.write_bits(3, 2);
                curr -= 1;
            }
            w.write_bits(0, 1);
        }
    }

    // The block data proper, 50 symbols per selector.
    let mut sel_ctr = 0usize;
    let mut gs = 0usize;
    while gs < n_mtf {
        let ge = (gs + G_SIZE - 1).min(n_mtf - 1);
        let t = selector[sel_ctr] as usize;
        for &sym in &mtfv[gs..=ge] {
            w.write_bits(code[t][sym as usize] as u32, len[t][sym as usize]);
        }
        gs = ge + 1;
        sel_ctr += 1;
    }
}

/// Compress `data` in one shot into a fresh `Vec`.
pub fn compress(data: &[u8], level: BlockSize) -> Result<Vec<u8>> {
    let mut engine = Compressor::new(level, 0)?;
    let mut out = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut in_pos = 0usize;
    loop {
        let (consumed, produced, status) =
            engine.process(&data[in_pos..], &mut chunk, Action::Finish)?;
        in_pos += consumed;
        out.extend_from_slice(&chunk[..produced]);
        if status == CompressStatus::StreamEnd {
            return Ok(out);
        }
    }
}

/// Compress `data` into a caller-supplied buffer, returning the compressed
/// length. Fails with [`BzError::OutputBufferFull`] if `output` is too
/// small; sizing it to the input length + 1% + 600 bytes always suffices.
pub fn compress_into(data: &[u8], output: &mut [u8], level: BlockSize) -> Result<usize> {
    let mut engine = Compressor::new(level, 0)?;
    let (_, produced, status) = engine.process(data, output, Action::Finish)?;
    match status {
        CompressStatus::StreamEnd => Ok(produced),
        _ => Err(BzError::OutputBufferFull {
            capacity: output.len(),
        }),
    }
}
