use super::*;

use simple_sds::serialize;

use std::fs;

//-----------------------------------------------------------------------------

fn true_paths() -> Vec<Vec<usize>> {
    vec![
        vec![11, 12, 14, 15, 17],
        vec![21, 22, 24, 25],
        vec![11, 12, 14, 15, 17],
        vec![11, 13, 14, 16, 17],
        vec![21, 22, 24, 23, 21],
        vec![21, 22, 24, 25],
    ]
}

fn build_gbwt(truth: &[Vec<usize>]) -> GBWT {
    let mut dynamic = DynamicGBWT::new();
    for path in truth {
        let mut text = path.clone();
        text.push(ENDMARKER);
        dynamic.insert(&text);
    }
    GBWT::from(&dynamic)
}

fn extract_sequence(index: &GBWT, id: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut pos = index.start(id);
    while let Some((node, offset)) = pos {
        result.push(node);
        pos = index.forward((node, offset));
    }
    result
}

// Counts the occurrences of the subpath in the true paths.
fn count_occurrences(truth: &[Vec<usize>], subpath: &[usize]) -> usize {
    let mut result = 0;
    for path in truth {
        for start in 0..path.len() {
            if path.len() - start >= subpath.len() && path[start..start + subpath.len()] == *subpath {
                result += 1;
            }
        }
    }
    result
}

// Searches for the subpath and returns the number of occurrences.
fn search(index: &GBWT, subpath: &[usize]) -> usize {
    let mut state = match index.find(subpath[0]) {
        Some(state) => state,
        None => return 0,
    };
    for node in subpath.iter().skip(1) {
        state = match index.extend(&state, *node) {
            Some(state) => state,
            None => return 0,
        };
    }
    state.len()
}

//-----------------------------------------------------------------------------

#[test]
fn empty_gbwt() {
    let index = GBWT::from(&DynamicGBWT::new());
    assert!(index.is_empty(), "The empty index is not empty");
    assert_eq!(index.sequences(), 0, "The empty index contains sequences");
    assert_eq!(index.start(0), None, "Got a start position from the empty index");
    assert_eq!(index.find(1), None, "Found a node in the empty index");
    assert_eq!(index.locate(1, 0), None, "Located a sequence in the empty index");
    serialize::test(&index, "empty-gbwt", None, true);
}

#[test]
fn statistics() {
    let truth = true_paths();
    let index = build_gbwt(&truth);

    let total: usize = truth.iter().map(|path| path.len() + 1).sum();
    assert_eq!(index.len(), total, "Invalid total length");
    assert!(!index.is_empty(), "Invalid emptiness");
    assert_eq!(index.sequences(), truth.len(), "Invalid number of sequences");
    assert_eq!(index.alphabet_size(), 26, "Invalid alphabet size");
    assert_eq!(index.alphabet_offset(), 10, "Invalid alphabet offset");
    assert_eq!(index.effective_size(), 16, "Invalid effective alphabet size");
    assert_eq!(index.first_node(), 11, "Invalid first node id");

    for i in 0..index.first_node() {
        assert!(!index.has_node(i), "Index should not contain node {}", i);
    }
    for i in index.first_node()..index.alphabet_size() {
        assert!(index.has_node(i), "Index should contain node {}", i);
    }
    assert!(!index.has_node(index.alphabet_size()), "Index contains a node past the end");

    assert_eq!(index.node_len(ENDMARKER), truth.len(), "Invalid endmarker record length");
    assert_eq!(index.node_len(14), 3, "Invalid length for the record of node 14");
    assert_eq!(index.node_len(18), 0, "Invalid length for an unvisited node");
}

#[test]
fn single_path() {
    let index = build_gbwt(&[vec![3, 4, 5]]);

    assert_eq!(index.sequences(), 1, "Invalid number of sequences");
    assert_eq!(index.len(), 4, "Invalid total length");
    assert_eq!(index.node_len(3), 1, "Invalid length for the record of node 3");

    assert_eq!(index.lf(ENDMARKER, 0), Some((3, 0)), "Invalid lf() from the endmarker");
    assert_eq!(index.lf(3, 0), Some((4, 0)), "Invalid lf() at node 3");
    assert_eq!(index.lf(4, 0), Some((5, 0)), "Invalid lf() at node 4");
    assert_eq!(index.lf(5, 0), Some((0, 0)), "Invalid lf() at node 5");
    assert_eq!(index.lf(5, 1), None, "Got an lf() result past the end of the record");

    assert_eq!(index.locate(3, 0), Some(0), "Invalid locate() at node 3");
}

#[test]
fn extract() {
    let truth = true_paths();
    let index = build_gbwt(&truth);

    for (id, path) in truth.iter().enumerate() {
        assert_eq!(extract_sequence(&index, id), *path, "Invalid path {}", id);
        let iterated: Vec<usize> = index.sequence(id).collect();
        assert_eq!(iterated, *path, "Invalid path {} from the iterator", id);
    }
    assert_eq!(index.start(truth.len()), None, "Got a start position for a nonexistent sequence");
}

#[test]
fn find_and_extend() {
    let truth = true_paths();
    let index = build_gbwt(&truth);

    let queries: Vec<Vec<usize>> = vec![
        vec![11],
        vec![11, 12],
        vec![21, 22, 24],
        vec![21, 22, 24, 25],
        vec![11, 12, 14, 15, 17],
        vec![14, 17],
        vec![11, 21],
        vec![18],
    ];
    for query in queries.iter() {
        assert_eq!(search(&index, query), count_occurrences(&truth, query), "Invalid number of occurrences for query {:?}", query);
    }

    // A search state cannot be extended with a node outside the alphabet.
    let state = index.find(11).unwrap();
    assert_eq!(index.extend(&state, 99), None, "Extended the search past the alphabet");
}

#[test]
fn locate_all_positions() {
    let truth = true_paths();
    let index = build_gbwt(&truth);

    // Walk each path and check that every position locates to the path and
    // that the samples never give a wrong id.
    for id in 0..index.sequences() {
        let mut pos = index.start(id);
        while let Some((node, offset)) = pos {
            assert_eq!(index.locate(node, offset), Some(id), "Invalid locate({}, {})", node, offset);
            if let Some(sample) = index.try_locate(node, offset) {
                assert_eq!(sample, id, "Invalid sample at ({}, {})", node, offset);
            }
            pos = index.forward((node, offset));
        }
    }

    // Offsets in the endmarker record are sequence ids.
    for id in 0..index.sequences() {
        assert_eq!(index.locate(ENDMARKER, id), Some(id), "Invalid locate() in the endmarker record");
    }
    assert_eq!(index.locate(ENDMARKER, index.sequences()), None, "Located a nonexistent sequence");
    assert_eq!(index.locate(14, 100), None, "Located a nonexistent position");
}

#[test]
fn serialize_gbwt() {
    let truth = true_paths();
    let index = build_gbwt(&truth);
    serialize::test(&index, "gbwt", None, true);
}

#[test]
fn load_from_dynamic() {
    // The dynamic and the compressed index share the serialization format.
    let truth = true_paths();
    let mut dynamic = DynamicGBWT::new();
    for path in truth.iter() {
        let mut text = path.clone();
        text.push(ENDMARKER);
        dynamic.insert(&text);
    }

    let filename = serialize::temp_file_name("gbwt-from-dynamic");
    serialize::serialize_to(&dynamic, &filename).unwrap();

    let loaded: GBWT = serialize::load_from(&filename).unwrap();
    assert_eq!(loaded, GBWT::from(&dynamic), "Loaded index differs from the converted index");

    let dynamic_loaded: DynamicGBWT = serialize::load_from(&filename).unwrap();
    assert_eq!(dynamic_loaded, dynamic, "Loaded dynamic index differs from the original");

    fs::remove_file(&filename).unwrap();
}

//-----------------------------------------------------------------------------
