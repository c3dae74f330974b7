//! Move-to-Front transform with zero-run re-encoding (encoder side).
//!
//! The L-column of the sorted rotation matrix is mapped through a
//! sequential alphabet of the bytes actually used, then move-to-front
//! coded. Runs of zeroes (the overwhelmingly common MTF output after a
//! good block sort) are re-encoded in bijective base 2 over the two
//! dedicated symbols RUNA/RUNB, and the block is terminated by EOB.
//! Symbol frequencies are recorded for the Huffman stage.

use crate::{MAX_ALPHA_SIZE, RUNA, RUNB};

/// The MTF-coded block: symbols over `{RUNA, RUNB, 2..=nInUse, EOB}`.
pub(crate) struct MtfEncoded {
    /// The symbol stream, EOB-terminated.
    pub mtfv: Vec<u16>,
    /// Frequency of each symbol in `mtfv`.
    pub freq: [i32; MAX_ALPHA_SIZE],
    /// `nInUse + 2`: RUNA and RUNB replace symbol 0, EOB is appended.
    pub alpha_size: usize,
}

/// Sequential-alphabet mapping of the used byte values.
fn make_maps(in_use: &[bool; 256]) -> ([u8; 256], usize) {
    let mut unseq_to_seq = [0u8; 256];
    let mut n_in_use = 0usize;
    for i in 0..256 {
        if in_use[i] {
            unseq_to_seq[i] = n_in_use as u8;
            n_in_use += 1;
        }
    }
    (unseq_to_seq, n_in_use)
}

/// Append a pending zero run as its bijective base-2 digits, least
/// significant first: run length `ℓ+1` is emitted as the digits of `ℓ`
/// with RUNA=0 and RUNB=1 valued 1 and 2.
fn flush_zero_run(z_pend: &mut usize, mtfv: &mut Vec<u16>, freq: &mut [i32; MAX_ALPHA_SIZE]) {
    if *z_pend == 0 {
        return;
    }
    let mut zp = *z_pend - 1;
    loop {
        if zp & 1 == 1 {
            mtfv.push(RUNB as u16);
            freq[RUNB as usize] += 1;
        } else {
            mtfv.push(RUNA as u16);
            freq[RUNA as usize] += 1;
        }
        if zp < 2 {
            break;
        }
        zp = (zp - 2) / 2;
    }
    *z_pend = 0;
}

/// MTF-encode the L-column of the sorted block.
///
/// `ptr` is the rotation permutation from the block sort; the L-column is
/// `block[(ptr[i] - 1) mod n]`. `in_use` marks the byte values present in
/// `block`.
pub(crate) fn encode_block(block: &[u8], ptr: &[u32], in_use: &[bool; 256]) -> MtfEncoded {
    let nblock = block.len();
    let (unseq_to_seq, n_in_use) = make_maps(in_use);
    let eob = (n_in_use + 1) as u16;

    let mut out = MtfEncoded {
        mtfv: Vec::with_capacity(nblock + 1),
        freq: [0; MAX_ALPHA_SIZE],
        alpha_size: n_in_use + 2,
    };

    // The MTF list over the sequential alphabet.
    let mut yy: Vec<u8> = (0..n_in_use as u8).collect();
    let mut z_pend = 0usize;

    for i in 0..nblock {
        let mut j = ptr[i] as usize;
        j = if j == 0 { nblock - 1 } else { j - 1 };
        let ll_i = unseq_to_seq[block[j] as usize];

        if yy[0] == ll_i {
            z_pend += 1;
            continue;
        }

        flush_zero_run(&mut z_pend, &mut out.mtfv, &mut out.freq);

        // Move-to-front: shift the prefix up and record the old position.
        let pos = yy
            .iter()
            .position(|&v| v == ll_i)
            .expect("L-column byte is in the used alphabet");
        yy.copy_within(0..pos, 1);
        yy[0] = ll_i;

        out.mtfv.push(pos as u16 + 1);
        out.freq[pos + 1] += 1;
    }

    flush_zero_run(&mut z_pend, &mut out.mtfv, &mut out.freq);

    out.mtfv.push(eob);
    out.freq[eob as usize] += 1;

    out
}
