//! End-to-end and streaming-contract tests for the two engines.

use oxbzip::{
    Action, BlockSize, BzError, CompressStatus, Compressor, DecompressStatus, Decompressor,
    compress, decompress,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn level(k: u8) -> BlockSize {
    BlockSize::new(k).unwrap()
}

/// Decompress with a chosen inverse-BWT representation.
fn decompress_small(data: &[u8], small: bool) -> oxbzip::Result<Vec<u8>> {
    let mut engine = Decompressor::new(small);
    let mut out = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut in_pos = 0usize;
    loop {
        let (consumed, produced, status) = engine.process(&data[in_pos..], &mut chunk)?;
        in_pos += consumed;
        out.extend_from_slice(&chunk[..produced]);
        match status {
            DecompressStatus::StreamEnd => return Ok(out),
            DecompressStatus::Ok => {
                if in_pos >= data.len() && produced == 0 {
                    return Err(BzError::UnexpectedEof);
                }
            }
        }
    }
}

#[test]
fn empty_input_stream_shape() {
    let out = compress(b"", level(1)).unwrap();
    assert_eq!(&out[..4], &[0x42, 0x5A, 0x68, 0x31]);
    assert_eq!(&out[4..], &[0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0, 0, 0, 0]);
    assert_eq!(decompress(&out).unwrap(), b"");
}

#[test]
fn single_byte_across_all_levels() {
    for k in 1..=9u8 {
        let out = compress(b"x", level(k)).unwrap();
        assert_eq!(decompress(&out).unwrap(), b"x", "level {k}");
    }
}

#[test]
fn eight_a_roundtrip_and_block_crc() {
    let data = b"AAAAAAAA";
    let out = compress(data, level(1)).unwrap();
    let stored = u32::from_be_bytes([out[10], out[11], out[12], out[13]]);
    assert_eq!(stored, oxbzip_core::Crc32::compute(data));
    assert_eq!(decompress(&out).unwrap(), data);
}

#[test]
fn mod_251_ramp_100k() {
    let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let out = compress(&data, level(1)).unwrap();
    assert_eq!(decompress(&out).unwrap(), data);
    // The small inverse-BWT representation must agree byte for byte.
    assert_eq!(decompress_small(&out, true).unwrap(), data);
    assert_eq!(decompress_small(&out, false).unwrap(), data);
}

#[test]
fn long_runs_exceeding_rle_segment() {
    // Runs longer than 255 force multiple RLE-1 segments.
    let mut data = vec![b'r'; 1000];
    data.extend_from_slice(b"tail");
    data.extend(vec![0u8; 600]);
    let out = compress(&data, level(1)).unwrap();
    assert_eq!(decompress(&out).unwrap(), data);
}

#[test]
fn multi_block_stream() {
    // Exceeds the level-1 block capacity, producing several blocks.
    let mut rng = StdRng::seed_from_u64(7);
    let data: Vec<u8> = (0..260_000).map(|_| rng.r#gen::<u8>() % 17).collect();
    let out = compress(&data, level(1)).unwrap();
    assert_eq!(decompress(&out).unwrap(), data);
}

#[test]
fn random_payloads_all_levels() {
    let mut rng = StdRng::seed_from_u64(42);
    for k in [1u8, 3, 9] {
        for size in [1usize, 2, 100, 4096, 70_000] {
            let data: Vec<u8> = (0..size).map(|_| rng.r#gen()).collect();
            let out = compress(&data, level(k)).unwrap();
            assert_eq!(decompress(&out).unwrap(), data, "level {k} size {size}");
        }
    }
}

#[test]
fn streaming_equivalence_chunk_sizes() {
    let data: Vec<u8> = (0..40_000u32).map(|i| (i * 31 % 200) as u8).collect();
    let reference = compress(&data, level(1)).unwrap();

    for chunk_size in [1usize, 7, 100, 8191] {
        let mut engine = Compressor::new(level(1), 0).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];

        let mut fed = 0usize;
        while fed < data.len() {
            let end = (fed + chunk_size).min(data.len());
            let mut piece = &data[fed..end];
            while !piece.is_empty() {
                let (consumed, produced, status) =
                    engine.process(piece, &mut buf, Action::Run).unwrap();
                assert_eq!(status, CompressStatus::RunOk);
                piece = &piece[consumed..];
                out.extend_from_slice(&buf[..produced]);
            }
            fed = end;
        }
        loop {
            let (_, produced, status) = engine.process(&[], &mut buf, Action::Finish).unwrap();
            out.extend_from_slice(&buf[..produced]);
            if status == CompressStatus::StreamEnd {
                break;
            }
        }
        assert_eq!(out, reference, "chunk size {chunk_size}");
    }
}

#[test]
fn output_buffer_size_independence() {
    let data: Vec<u8> = (0..20_000u32).map(|i| (i % 97) as u8).collect();
    let reference = compress(&data, level(1)).unwrap();

    for out_size in [1usize, 2, 3, 17, 1024] {
        let mut engine = Compressor::new(level(1), 0).unwrap();
        let mut out = Vec::new();
        let mut buf = vec![0u8; out_size];
        let mut in_pos = 0usize;
        loop {
            let (consumed, produced, status) = engine
                .process(&data[in_pos..], &mut buf, Action::Finish)
                .unwrap();
            in_pos += consumed;
            out.extend_from_slice(&buf[..produced]);
            if status == CompressStatus::StreamEnd {
                break;
            }
        }
        assert_eq!(out, reference, "output buffer {out_size}");
    }
}

#[test]
fn decompress_in_one_byte_steps() {
    let data = b"tiny buffers on both sides of the decompressor";
    let compressed = compress(data, level(1)).unwrap();

    let mut engine = Decompressor::new(false);
    let mut out = Vec::new();
    let mut one = [0u8; 1];
    let mut in_pos = 0usize;
    loop {
        let input = if in_pos < compressed.len() {
            &compressed[in_pos..in_pos + 1]
        } else {
            &[][..]
        };
        let (consumed, produced, status) = engine.process(input, &mut one).unwrap();
        in_pos += consumed;
        out.extend_from_slice(&one[..produced]);
        if status == DecompressStatus::StreamEnd {
            break;
        }
    }
    assert_eq!(out, data);
}

#[test]
fn flush_preserves_stream_validity() {
    let mut engine = Compressor::new(level(1), 0).unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];

    let (consumed, produced, status) = engine
        .process(b"first half / ", &mut buf, Action::Run)
        .unwrap();
    assert_eq!(status, CompressStatus::RunOk);
    assert_eq!(consumed, 13);
    out.extend_from_slice(&buf[..produced]);

    // Drain everything buffered so far.
    loop {
        let (_, produced, status) = engine.process(&[], &mut buf, Action::Flush).unwrap();
        out.extend_from_slice(&buf[..produced]);
        if status == CompressStatus::RunOk {
            break;
        }
        assert_eq!(status, CompressStatus::FlushOk);
    }
    let flushed_len = out.len();
    assert!(flushed_len > 4, "flush must have emitted the first block");

    let (_, produced, status) = engine
        .process(b"second half", &mut buf, Action::Run)
        .unwrap();
    assert_eq!(status, CompressStatus::RunOk);
    out.extend_from_slice(&buf[..produced]);
    loop {
        let (_, produced, status) = engine.process(&[], &mut buf, Action::Finish).unwrap();
        out.extend_from_slice(&buf[..produced]);
        if status == CompressStatus::StreamEnd {
            break;
        }
    }

    assert_eq!(decompress(&out).unwrap(), b"first half / second half");
}

#[test]
fn concatenated_streams_consume_both() {
    let first = compress(b"alpha ", level(1)).unwrap();
    let second = compress(b"beta", level(2)).unwrap();
    let mut joined = first.clone();
    joined.extend_from_slice(&second);

    let mut engine = Decompressor::new(false);
    let mut out = vec![0u8; 64];
    let (consumed, produced, status) = engine.process(&joined, &mut out).unwrap();
    assert_eq!(status, DecompressStatus::StreamEnd);
    assert_eq!(consumed, first.len(), "first stream ends at its trailer");
    assert_eq!(&out[..produced], b"alpha ");

    let mut engine = Decompressor::new(false);
    let (consumed2, produced, status) = engine.process(&joined[consumed..], &mut out).unwrap();
    assert_eq!(status, DecompressStatus::StreamEnd);
    assert_eq!(consumed2, second.len());
    assert_eq!(&out[..produced], b"beta");
}

#[test]
fn corruption_of_any_single_byte_is_caught() {
    let data: Vec<u8> = (0..2000u32).map(|i| (i % 55) as u8).collect();
    let reference = compress(&data, level(1)).unwrap();

    // Flip one bit in a spread of positions across the stream, including
    // byte 37 and the trailer region. The final byte is excluded: its low
    // bits may be alignment padding, which no decoder reads.
    let positions: Vec<usize> = (0..reference.len() - 1).step_by(11).chain([37]).collect();
    for pos in positions {
        let mut bad = reference.clone();
        bad[pos] ^= 0x10;
        match decompress(&bad) {
            Ok(out) => panic!("corruption at {pos} went unnoticed (got {} bytes)", out.len()),
            Err(e) => assert!(e.is_data_error(), "unexpected error kind at {pos}: {e}"),
        }
    }
}

#[test]
fn combined_crc_is_folded_block_crcs() {
    // Single-block stream: trailer equals rotl1(0) ^ blockCRC = blockCRC,
    // which in turn is the CRC of the raw input.
    let data = b"one block only";
    let single = compress(data, level(1)).unwrap();
    let block_crc = u32::from_be_bytes([single[10], single[11], single[12], single[13]]);
    assert_eq!(block_crc, oxbzip_core::Crc32::compute(data));
    let trailer = u32::from_be_bytes([
        single[single.len() - 4],
        single[single.len() - 3],
        single[single.len() - 2],
        single[single.len() - 1],
    ]);
    assert_eq!(trailer, block_crc);

    // Two-stream fold check: compress the halves separately, fold their
    // block CRCs by hand, and compare against a two-block stream's trailer.
    let part_a = vec![11u8; 120_000];
    let part_b = vec![23u8; 50_000];
    let crc_of = |bytes: &[u8]| {
        let s = compress(bytes, level(1)).unwrap();
        u32::from_be_bytes([s[10], s[11], s[12], s[13]])
    };
    // 120k of one byte RLE-encodes far below the level-1 capacity, so the
    // two-block split of the concatenation happens exactly at the halves'
    // boundary only if the first block fills; instead force the split with
    // a Flush between the halves.
    let mut engine = Compressor::new(level(1), 0).unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    let mut feed = |engine: &mut Compressor, out: &mut Vec<u8>, data: &[u8], action: Action| loop {
        let (consumed, produced, status) = engine.process(data, &mut buf, action).unwrap();
        out.extend_from_slice(&buf[..produced]);
        assert_eq!(consumed, data.len());
        match (action, status) {
            (Action::Run, CompressStatus::RunOk)
            | (Action::Flush, CompressStatus::RunOk)
            | (Action::Finish, CompressStatus::StreamEnd) => break,
            _ => (),
        }
    };
    feed(&mut engine, &mut out, &part_a, Action::Run);
    feed(&mut engine, &mut out, &[], Action::Flush);
    feed(&mut engine, &mut out, &part_b, Action::Finish);

    let trailer = u32::from_be_bytes([
        out[out.len() - 4],
        out[out.len() - 3],
        out[out.len() - 2],
        out[out.len() - 1],
    ]);
    let expected = (0u32.rotate_left(1) ^ crc_of(&part_a)).rotate_left(1) ^ crc_of(&part_b);
    assert_eq!(trailer, expected);
    assert_eq!(decompress(&out).unwrap(), [part_a, part_b].concat());
}

#[test]
fn small_and_fast_agree_on_random_data() {
    let mut rng = StdRng::seed_from_u64(99);
    let data: Vec<u8> = (0..30_000).map(|_| rng.r#gen()).collect();
    let out = compress(&data, level(1)).unwrap();
    assert_eq!(
        decompress_small(&out, true).unwrap(),
        decompress_small(&out, false).unwrap()
    );
}

#[test]
fn compressible_text_shrinks() {
    let data = b"the quick brown fox jumps over the lazy dog\n".repeat(500);
    let out = compress(&data, level(9)).unwrap();
    assert!(out.len() < data.len() / 4, "{} vs {}", out.len(), data.len());
    assert_eq!(decompress(&out).unwrap(), data);
}
