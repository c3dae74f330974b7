//! Burrows-Wheeler block sort.
//!
//! The sort produces, for a block of bytes, the permutation `ptr` such that
//! `ptr[i]` is the starting index of the i-th lexicographically smallest
//! *rotation* of the block, together with the origin pointer identifying the
//! row that equals the block itself. The last column of the sorted rotation
//! matrix (read off through `ptr` by the MTF stage) is what actually gets
//! compressed.
//!
//! Two strategies are used. Small blocks go through a plain comparison sort
//! over rotation starts, with a 4-byte prefix key to keep most comparisons
//! cheap. Larger blocks use rank doubling: rotations are repeatedly sorted
//! by (rank, rank-at-offset) pairs with the offset doubling each round, so
//! the total work is bounded by O(n log² n) on any input, including the
//! highly repetitive blocks that defeat plain comparison sorting. The
//! `work_factor` parameter scales the cutover point between the two.

/// Sort the rotations of `block`.
///
/// Returns the sorted-rotation permutation and the origin pointer (the row
/// equal to the unrotated block). `block` must not be empty.
pub fn sort_block(block: &[u8], work_factor: u32) -> (Vec<u32>, u32) {
    debug_assert!(!block.is_empty());
    let wf = if work_factor == 0 { 30 } else { work_factor };
    // Default work factor 30 puts the cutover at 3600 bytes.
    let cutoff = wf as usize * 120;

    let ptr = if block.len() <= cutoff {
        comparison_sort(block)
    } else {
        doubling_sort(block)
    };

    let orig_ptr = ptr
        .iter()
        .position(|&p| p == 0)
        .expect("rotation 0 is always present") as u32;
    (ptr, orig_ptr)
}

/// Direct comparison sort of rotation start indices.
fn comparison_sort(block: &[u8]) -> Vec<u32> {
    let n = block.len();
    let mut indices: Vec<u32> = (0..n as u32).collect();

    if n > 8 {
        // Pre-compute 4-byte prefixes so equal-prefix rotations are the only
        // ones that pay for a full rotation comparison.
        let key_len = n.min(4);
        let keys: Vec<u32> = (0..n)
            .map(|i| {
                let mut key = 0u32;
                for j in 0..key_len {
                    key = (key << 8) | block[(i + j) % n] as u32;
                }
                key
            })
            .collect();

        indices.sort_unstable_by(|&a, &b| {
            keys[a as usize].cmp(&keys[b as usize]).then_with(|| {
                let (a, b) = (a as usize, b as usize);
                for i in key_len..n {
                    let ba = block[(a + i) % n];
                    let bb = block[(b + i) % n];
                    match ba.cmp(&bb) {
                        std::cmp::Ordering::Equal => continue,
                        other => return other,
                    }
                }
                std::cmp::Ordering::Equal
            })
        });
    } else {
        indices.sort_unstable_by(|&a, &b| {
            let (a, b) = (a as usize, b as usize);
            for i in 0..n {
                match block[(a + i) % n].cmp(&block[(b + i) % n]) {
                    std::cmp::Ordering::Equal => continue,
                    other => return other,
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    indices
}

/// Rank-doubling rotation sort (Manber-Myers over the cyclic string).
///
/// After the round with offset `step`, `rank[i]` is the rank of the
/// 2·`step`-byte prefix of rotation `i`; once all ranks are distinct (or the
/// prefix covers the block) the order is final. Rotations still tied at the
/// end are byte-identical, so any tie order is a valid sort.
fn doubling_sort(block: &[u8]) -> Vec<u32> {
    let n = block.len();
    let mut order: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<u32> = block.iter().map(|&b| b as u32).collect();
    let mut next_rank = vec![0u32; n];

    let mut step = 1usize;
    while step < n {
        order.sort_unstable_by(|&a, &b| {
            let (a, b) = (a as usize, b as usize);
            (rank[a], rank[(a + step) % n]).cmp(&(rank[b], rank[(b + step) % n]))
        });

        next_rank[order[0] as usize] = 0;
        for j in 1..n {
            let prev = order[j - 1] as usize;
            let cur = order[j] as usize;
            let same =
                rank[cur] == rank[prev] && rank[(cur + step) % n] == rank[(prev + step) % n];
            next_rank[cur] = next_rank[prev] + u32::from(!same);
        }
        rank.copy_from_slice(&next_rank);

        if rank[order[n - 1] as usize] as usize == n - 1 {
            break;
        }
        step *= 2;
    }

    order
}
