use super::*;

use simple_sds::bits;

use rand::Rng;
use rand::rngs::ThreadRng;

//-----------------------------------------------------------------------------

// Generate a random value, with the width (almost) geometrically distributed (p = 0.5) in blocks of `w` bits.
fn generate_value(rng: &mut ThreadRng, w: usize) -> usize {
    let blocks = (rng.gen::<usize>() | 1).leading_zeros() as usize; // 0 to 63
    let width = cmp::min((blocks + 1) * w, bits::WORD_BITS);
    let mask = bits::low_set(width) as usize;
    rng.gen::<usize>() & mask
}

// Generate `n` random values, with the widths (almost) geometrically distributed (p = 0.5) in blocks of `w` bits.
fn generate_values(n: usize, w: usize) -> Vec<usize> {
    let mut result = Vec::with_capacity(n);
    let mut rng = rand::thread_rng();
    for _ in 0..n {
        result.push(generate_value(&mut rng, w));
    }
    result
}

//-----------------------------------------------------------------------------

#[test]
fn byte_code_basics() {
    let mut encoder = ByteCode::new();
    assert_eq!(encoder.len(), 0, "Newly created encoder contains bytes");
    assert!(encoder.is_empty(), "Newly created encoder is not empty");

    encoder.write(0);
    encoder.write(127);
    encoder.write(128);
    assert_eq!(*encoder.as_ref(), [0, 127, 0x80, 1], "Invalid encoding for the boundary values");

    let mut iter = ByteCodeIter::new(encoder.as_ref());
    assert_eq!(iter.next(), Some(0), "Invalid value for 0");
    assert_eq!(iter.next(), Some(127), "Invalid value for 127");
    assert_eq!(iter.next(), Some(128), "Invalid value for 128");
    assert_eq!(iter.next(), None, "Got a value from an exhausted iterator");
    assert_eq!(iter.offset(), encoder.len(), "Iterator did not consume all bytes");
}

#[test]
fn random_byte_code() {
    let values = generate_values(647, 4);
    let mut encoder = ByteCode::new();
    for value in values.iter() {
        encoder.write(*value);
    }
    assert!(encoder.len() >= values.len(), "The encoding is shorter than the number of values");

    let mut iter = ByteCodeIter::new(encoder.as_ref());
    assert_eq!(iter.offset(), 0, "Newly created iterator is not at offset 0");
    let mut i = 0;
    while let Some(value) = iter.next() {
        assert!(i < values.len(), "Too many values from the iterator");
        assert_eq!(value, values[i], "Invalid value {}", i);
        i += 1;
    }
    assert_eq!(i, values.len(), "Too few values from the iterator");
    assert_eq!(iter.offset(), encoder.len(), "Iterator did not consume all bytes");
}

#[test]
fn truncated_byte_code() {
    let mut encoder = ByteCode::new();
    encoder.write(12345678);
    let bytes = encoder.as_ref();
    let mut iter = ByteCodeIter::new(&bytes[0..bytes.len() - 1]);
    assert_eq!(iter.next(), None, "Got a value from a truncated encoding");
}

//-----------------------------------------------------------------------------

// Generate `n` random runs from an alphabet of size `sigma`.
// The widths of run lengths are (almost) geometrically distributed (p = 0.5) in blocks of `w` bits.
fn generate_runs(n: usize, sigma: usize, w: usize) -> Vec<(usize, usize)> {
    let sigma = if sigma == 0 { usize::MAX } else { sigma };
    let mut result = Vec::with_capacity(n);
    let mut rng = rand::thread_rng();
    for _ in 0..n {
        let value: usize = rng.gen_range(0..sigma);
        let len = generate_value(&mut rng, w) + 1;
        result.push((value, len));
    }
    result
}

fn encode_runs(encoder: &mut Run, runs: &[(usize, usize)], name: &str) {
    assert_eq!(encoder.len(), 0, "[{}]: Newly created encoder contains runs", name);
    assert!(encoder.is_empty(), "[{}]: Newly created encoder is not empty", name);
    for (value, len) in runs.iter() {
        encoder.write(*value, *len);
    }
    assert!(encoder.len() >= runs.len(), "[{}]: The encoding is shorter than the number of runs", name);
}

fn check_runs(encoder: &Run, truth: &[(usize, usize)], name: &str) {
    let mut iter = RunIter::new(encoder.as_ref(), encoder.sigma());
    assert_eq!(iter.offset(), 0, "[{}]: Newly created iterator is not at offset 0", name);
    let mut i = 0;
    while let Some(run) = iter.next() {
        assert!(i < truth.len(), "[{}]: Too many runs from the iterator", name);
        assert_eq!(run, truth[i], "[{}]: Invalid run {}", name, i);
        i += 1;
    }
    assert_eq!(i, truth.len(), "[{}]: Too few runs from the iterator", name);
    assert_eq!(iter.offset(), encoder.len(), "[{}]: Iterator did not consume all bytes", name);
}

fn test_runs(n: usize, sigma: usize, name: &str) {
    let runs = generate_runs(n, sigma, 4);
    let mut encoder = Run::new(sigma);
    encode_runs(&mut encoder, &runs, name);
    check_runs(&encoder, &runs, name);
}

fn add_run(encoder: &mut Run, truth: &mut Vec<(usize, usize)>, len: usize, bytes: usize, name: &str) {
    let old_len = encoder.len();
    encoder.write(encoder.sigma() - 1, len);
    truth.push((encoder.sigma() - 1, len));
    assert_eq!(encoder.len() - old_len, bytes, "[{}]: Run of length {} not encoded using {} byte(s)", name, len, bytes);
}

fn test_threshold(sigma: usize, name: &str) {
    let (sigma, threshold) = run_params(sigma);
    let mut encoder = Run::new(sigma);
    let mut truth: Vec<(usize, usize)> = Vec::new();
    if threshold > 1 {
        add_run(&mut encoder, &mut truth, threshold - 1, 1, name);
    }
    if threshold > 0 {
        add_run(&mut encoder, &mut truth, threshold, 2, name);
    }
    check_runs(&encoder, &truth, name);
}

#[test]
fn runs_with_sigma() {
    test_runs(591, 4, "sigma == 4");
    test_runs(366, 254, "sigma == 254");
    test_runs(421, 255, "sigma == 255");
    test_runs(283, 14901, "sigma == 14901");
    test_runs(330, 0, "sigma == 0");
}

#[test]
fn run_length_thresholds() {
    test_threshold(1, "sigma == 1");
    test_threshold(4, "sigma == 4");
    test_threshold(5, "sigma == 5");
    test_threshold(128, "sigma == 128");
    test_threshold(129, "sigma == 129");
    test_threshold(254, "sigma == 254");
}

#[test]
fn encoded_record() {
    // Original data for the record.
    let sigma = 4;
    let edges: Vec<(usize, usize)> = vec![(0, 0), (13, 7), (22, 1), (44, 0)];
    let runs = generate_runs(8, sigma, 4);

    // Encode the record.
    let mut encoder = ByteCode::new();
    encoder.write(sigma);
    let mut prev = 0;
    for (node, offset) in edges.iter() {
        encoder.write(*node - prev); encoder.write(*offset);
        prev = *node;
    }
    let mut encoder = Run::from_byte_code(encoder, sigma);
    for (value, len) in runs.iter() {
        encoder.write(*value, *len);
    }

    // Decompress the record.
    let mut iter = ByteCodeIter::new(encoder.as_ref());
    assert_eq!(iter.next(), Some(sigma), "Invalid alphabet size in the record");
    let mut prev = 0;
    for i in 0..sigma {
        let node = iter.next().unwrap() + prev;
        assert_eq!(node, edges[i].0, "Invalid successor node {}", i);
        prev = node;
        assert_eq!(iter.next(), Some(edges[i].1), "Invalid record offset for edge {}", i);
    }
    let mut iter = RunIter::from_byte_code(iter, sigma);
    let mut decoded: Vec<(usize, usize)> = Vec::new();
    while let Some(run) = iter.next() {
        decoded.push(run);
    }
    assert_eq!(decoded, runs, "Invalid runs in the record");
    assert_eq!(iter.offset(), encoder.len(), "Iterator did not consume all bytes");
}

//-----------------------------------------------------------------------------

#[test]
fn range_intersections() {
    assert_eq!(intersect(&(2..8), &(4..10)), 4..8, "Invalid overlapping intersection");
    assert_eq!(intersect(&(2..8), &(2..8)), 2..8, "Invalid intersection with self");
    assert!(intersect(&(2..4), &(6..8)).is_empty(), "Non-empty intersection for disjoint ranges");
    assert!(intersect(&(2..4), &(3..3)).is_empty(), "Non-empty intersection with an empty range");
}

//-----------------------------------------------------------------------------
