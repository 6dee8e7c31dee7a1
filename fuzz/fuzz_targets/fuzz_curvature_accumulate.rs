#![no_main]

use libfuzzer_sys::fuzz_target;
use sl_fit::CurvatureAccumulator;

// Feed arbitrary sparse index/value lists into the accumulator and check
// the structural invariants: exact symmetry of the dense extraction and
// no entries outside the declared dimension.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Keep the matrix small so to_dense stays fast.
    let n = (data[0] as usize % 32) + 1;
    let mut acc = CurvatureAccumulator::with_estimate(n, 64);

    let mut chunks = data[1..].chunks_exact(3);
    let mut indices = Vec::new();
    let mut values = Vec::new();
    for chunk in &mut chunks {
        indices.push(chunk[0] as usize % n);
        values.push((chunk[1] as f64 - 128.0) / 16.0);
        if indices.len() == 8 {
            // Indices must be distinct within one active set.
            indices.sort_unstable();
            indices.dedup();
            values.truncate(indices.len());
            let scale = (chunk[2] as f64) / 64.0;
            acc.add_outer(&indices, &values, scale);
            indices.clear();
            values.clear();
        }
    }

    let dense = acc.to_dense();
    assert_eq!(dense.nrows(), n);
    for i in 0..n {
        for j in 0..n {
            assert_eq!(dense[(i, j)].to_bits(), dense[(j, i)].to_bits());
        }
    }
});
