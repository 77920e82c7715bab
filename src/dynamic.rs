//! The dynamic GBWT index used during construction.
//!
//! [`DynamicGBWT`] stores one mutable record per node in the effective
//! alphabet and supports inserting batches of endmarker-terminated paths
//! while maintaining the BWT invariant. The finished index is compressed
//! into a [`crate::GBWT`], which answers the queries with less memory.
//!
//! # Examples
//!
//! ```
//! use gbwt_dynamic::DynamicGBWT;
//!
//! let mut index = DynamicGBWT::new();
//! index.insert(&[3, 4, 5, 0]);
//! index.insert(&[3, 4, 6, 0]);
//!
//! assert_eq!(index.sequences(), 2);
//! assert_eq!(index.len(), 8);
//! assert_eq!(index.alphabet_size(), 7);
//! assert_eq!(index.alphabet_offset(), 2);
//!
//! // Both paths pass through node 4, where they diverge.
//! assert_eq!(index.node_len(4), 2);
//! assert_eq!(index.lf(4, 0), Some((5, 0)));
//! assert_eq!(index.lf(4, 1), Some((6, 0)));
//! assert_eq!(index.follow(3, &(0..2), 4), Some(0..2));
//! ```

use crate::bwt::{BWT, BWTBuilder};
use crate::gbwt::GBWT;
use crate::headers::{Header, GBWTPayload};
use crate::samples::DASamples;
use crate::support;
use crate::ENDMARKER;

use rayon::prelude::*;

use simple_sds::serialize::Serialize;

use std::io::{Error, ErrorKind};
use std::ops::Range;
use std::{cmp, io};


//-----------------------------------------------------------------------------

/// A mutable node record in [`DynamicGBWT`].
///
/// The record for node `v` stores the incoming edges as (predecessor, count)
/// pairs sorted by predecessor, the outgoing edges as (successor, BWT offset
/// in the successor) pairs, the body as (out-rank, length) runs, and the
/// document array samples as (offset, sequence id) pairs sorted by offset.
/// The BWT offset stored for an outgoing edge is the destination of the
/// first sequence in the record that continues with that successor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicRecord {
    pub(crate) body_size: usize,
    pub(crate) incoming: Vec<(usize, usize)>,
    pub(crate) outgoing: Vec<(usize, usize)>,
    pub(crate) body: Vec<(usize, usize)>,
    pub(crate) ids: Vec<(usize, usize)>,
}

impl DynamicRecord {
    /// Returns the length of the record.
    #[inline]
    pub fn len(&self) -> usize {
        self.body_size
    }

    /// Returns `true` if the record is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of runs in the body.
    #[inline]
    pub fn runs(&self) -> usize {
        self.body.len()
    }

    /// Returns the indegree of the node.
    #[inline]
    pub fn indegree(&self) -> usize {
        self.incoming.len()
    }

    /// Returns the outdegree of the node.
    #[inline]
    pub fn outdegree(&self) -> usize {
        self.outgoing.len()
    }

    /// Returns the number of document array samples in the record.
    #[inline]
    pub fn samples(&self) -> usize {
        self.ids.len()
    }

    /// Returns the successor node of rank `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.outdegree()`.
    #[inline]
    pub fn successor(&self, i: usize) -> usize {
        self.outgoing[i].0
    }

    /// Returns the BWT offset in the successor node of rank `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.outdegree()`.
    #[inline]
    pub fn offset(&self, i: usize) -> usize {
        self.outgoing[i].1
    }

    /// Returns the predecessor node of rank `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.indegree()`.
    #[inline]
    pub fn predecessor(&self, i: usize) -> usize {
        self.incoming[i].0
    }

    /// Returns the number of sequences entering from the predecessor of rank `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.indegree()`.
    #[inline]
    pub fn count(&self, i: usize) -> usize {
        self.incoming[i].1
    }

    /// Returns the rank of the edge to the given node, or [`None`] if there is no such edge.
    pub fn edge_to(&self, node: usize) -> Option<usize> {
        self.outgoing.iter().position(|edge| edge.0 == node)
    }

    /// Returns an iterator over the samples `(offset, sequence id)` in the record.
    pub fn sample_iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.ids.iter().copied()
    }

    /// Returns the sampled sequence identifier at offset `i`, or [`None`] if there is no sample.
    pub fn sample_at(&self, i: usize) -> Option<usize> {
        match self.ids.binary_search_by_key(&i, |sample| sample.0) {
            Ok(index) => Some(self.ids[index].1),
            Err(_) => None,
        }
    }

    /// Follows the sequence at offset `i` and returns (successor node, offset in successor).
    ///
    /// A sequence that ends at offset `i` maps into the endmarker record.
    /// Returns [`None`] if offset `i` does not exist.
    pub fn lf(&self, i: usize) -> Option<(usize, usize)> {
        if i >= self.len() {
            return None;
        }
        let mut result = self.outgoing.clone();
        let mut last_edge = 0;
        let mut offset = 0;
        for &(rank, len) in self.body.iter() {
            last_edge = rank;
            result[rank].1 += len;
            offset += len;
            if offset > i {
                break;
            }
        }
        result[last_edge].1 -= offset - i;
        Some(result[last_edge])
    }

    /// Follows the sequence at offset `i` to the given node and returns the offset in that node.
    ///
    /// The result is the number of sequences before offset `i` that continue
    /// with `node`, plus the BWT offset stored for the edge. Offsets at or
    /// beyond `self.len()` count all such sequences. Returns [`None`] if
    /// there is no edge to the given node.
    pub fn lf_to(&self, i: usize, node: usize) -> Option<usize> {
        let outrank = self.edge_to(node)?;
        let mut result = self.offset(outrank);
        let mut offset = 0;
        for &(rank, len) in self.body.iter() {
            if offset >= i {
                break;
            }
            if rank == outrank {
                result += cmp::min(len, i - offset);
            }
            offset += len;
        }
        Some(result)
    }

    /// Follows all sequences in the offset range to the given node.
    ///
    /// Returns a semiopen offset range in the destination node, or [`None`] if no such sequences exist.
    pub fn follow(&self, range: &Range<usize>, node: usize) -> Option<Range<usize>> {
        if range.is_empty() {
            return None;
        }
        let outrank = self.edge_to(node)?;

        let mut result = self.offset(outrank)..self.offset(outrank);
        let mut offset = 0;
        for &(rank, len) in self.body.iter() {
            if rank == outrank {
                let run = offset..offset + len;
                result.start += support::intersect(&run, &(0..range.start)).len();
                result.end += support::intersect(&run, &(0..range.end)).len();
            }
            offset += len;
            if offset >= range.end {
                break;
            }
        }

        if result.is_empty() { None } else { Some(result) }
    }

    /// Returns the successor node at offset `i`, or [`None`] if the offset does not exist.
    ///
    /// The successor is [`ENDMARKER`] if the sequence ends at offset `i`.
    pub fn node_at(&self, i: usize) -> Option<usize> {
        let mut offset = 0;
        for &(rank, len) in self.body.iter() {
            offset += len;
            if offset > i {
                return Some(self.successor(rank));
            }
        }
        None
    }

    // Adds one to the count of the incoming edge from the given node,
    // inserting the edge if necessary.
    pub(crate) fn increment(&mut self, from: usize) {
        for rank in 0..self.indegree() {
            if self.incoming[rank].0 == from {
                self.incoming[rank].1 += 1;
                return;
            }
        }
        self.incoming.push((from, 1));
        self.incoming.sort_unstable();
    }

    // Sorts the outgoing edges by the destination node and relabels the
    // out-ranks in the body accordingly. Serialization requires sorted
    // edges, as the destination node ids are gap-encoded.
    pub(crate) fn recode(&mut self) {
        if self.outgoing.is_empty() {
            return;
        }

        let mut sorted = true;
        for rank in 1..self.outdegree() {
            if self.successor(rank) < self.successor(rank - 1) {
                sorted = false;
                break;
            }
        }
        if sorted {
            return;
        }

        let outgoing = &self.outgoing;
        for run in self.body.iter_mut() {
            run.0 = outgoing[run.0].0;
        }
        self.outgoing.sort_unstable();
        let outgoing = &self.outgoing;
        for run in self.body.iter_mut() {
            let node = run.0;
            run.0 = outgoing.binary_search_by(|edge| edge.0.cmp(&node)).unwrap();
        }
    }
}

//-----------------------------------------------------------------------------

// A cursor tracking one new path through the BWT during batch insertion.
//
// `offset` is the position of the cursor in the record of `curr`, and `pos`
// is the position of `next` in the text.
#[derive(Clone, Copy, Debug)]
struct Sequence {
    id: usize,
    curr: usize,
    next: usize,
    offset: usize,
    pos: usize,
}

// Collects a run-length encoded body, merging adjacent runs with the same rank.
#[derive(Clone, Debug, Default)]
struct RunMerger {
    runs: Vec<(usize, usize)>,
    total: usize,
}

impl RunMerger {
    fn with_capacity(n: usize) -> Self {
        RunMerger {
            runs: Vec::with_capacity(n),
            total: 0,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.total
    }

    fn push(&mut self, rank: usize, len: usize) {
        if len == 0 {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.0 == rank {
                last.1 += len;
                self.total += len;
                return;
            }
        }
        self.runs.push((rank, len));
        self.total += len;
    }
}

//-----------------------------------------------------------------------------

/// The dynamic GBWT index.
///
/// The index is built by inserting batches of paths with [`DynamicGBWT::insert`]
/// and related methods. Each path is a sequence of node identifiers followed
/// by the endmarker, and the paths receive identifiers in insertion order.
/// The finished index is compressed with `GBWT::from` or serialized directly.
/// See the module-level documentation for an example.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicGBWT {
    header: Header<GBWTPayload>,
    bwt: Vec<DynamicRecord>,
}

/// Index statistics.
impl DynamicGBWT {
    /// Default batch size in nodes for [`DynamicGBWT::insert_from`].
    pub const INSERT_BATCH_SIZE: usize = 100_000_000;

    /// Default batch size in sequences for [`DynamicGBWT::merge`].
    pub const MERGE_BATCH_SIZE: usize = 2000;

    /// A sequence is sampled at every `SAMPLE_INTERVAL` positions, in addition to its first and last positions.
    pub const SAMPLE_INTERVAL: usize = 1024;

    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total length of the sequences in the index, including the endmarkers.
    #[inline]
    pub fn len(&self) -> usize {
        self.header.payload().size
    }

    /// Returns `true` if the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of sequences in the index.
    #[inline]
    pub fn sequences(&self) -> usize {
        self.header.payload().sequences
    }

    /// Returns the size of the alphabet.
    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.header.payload().alphabet_size
    }

    /// Returns the alphabet offset for the effective alphabet.
    #[inline]
    pub fn alphabet_offset(&self) -> usize {
        self.header.payload().offset
    }

    /// Returns the size of the effective alphabet.
    #[inline]
    pub fn effective_size(&self) -> usize {
        self.alphabet_size() - self.alphabet_offset()
    }

    /// Returns the smallest node identifier in the effective alphabet.
    #[inline]
    pub fn first_node(&self) -> usize {
        self.alphabet_offset() + 1
    }

    /// Returns `true` if node identifier `id` is in the effective alphabet.
    #[inline]
    pub fn has_node(&self, id: usize) -> bool {
        id > self.alphabet_offset() && id < self.alphabet_size()
    }

    /// Returns the number of BWT positions in the record of the given node.
    ///
    /// This is the number of times the paths visit the node. The length of
    /// the endmarker record equals the number of sequences.
    pub fn node_len(&self, node: usize) -> usize {
        if node == ENDMARKER {
            return self.sequences();
        }
        self.record_for(node).map_or(0, |record| record.len())
    }

    /// Returns the total number of runs in the record bodies.
    pub fn runs(&self) -> usize {
        self.bwt.iter().map(|record| record.runs()).sum()
    }

    /// Returns the total number of document array samples.
    pub fn samples(&self) -> usize {
        self.bwt.iter().map(|record| record.samples()).sum()
    }

    // Converts a node id to a record index in `self.bwt`.
    #[inline]
    fn to_comp(&self, node: usize) -> usize {
        if node == ENDMARKER { 0 } else { node - self.alphabet_offset() }
    }

    // Returns the record for the given node, or `None` if the node does not
    // exist. The endmarker record is accessible when it exists.
    fn record_for(&self, node: usize) -> Option<&DynamicRecord> {
        if node == ENDMARKER {
            return self.bwt.first();
        }
        if !self.has_node(node) {
            return None;
        }
        Some(&self.bwt[self.to_comp(node)])
    }

    // Returns the records in record index order.
    pub(crate) fn records(&self) -> &[DynamicRecord] {
        &self.bwt
    }

    pub(crate) fn header(&self) -> Header<GBWTPayload> {
        self.header
    }
}

//-----------------------------------------------------------------------------

/// Queries.
impl DynamicGBWT {
    /// Follows the sequence at the given position and returns (successor node, offset in successor).
    ///
    /// A sequence that ends at the position maps into the endmarker record.
    /// Returns [`None`] if the position does not exist.
    pub fn lf(&self, node: usize, i: usize) -> Option<(usize, usize)> {
        self.record_for(node)?.lf(i)
    }

    /// Follows the sequence at the given position to node `to` and returns the offset in that node.
    ///
    /// Returns [`None`] if the node does not exist or has no edge to `to`.
    pub fn lf_to(&self, node: usize, i: usize, to: usize) -> Option<usize> {
        self.record_for(node)?.lf_to(i, to)
    }

    /// Follows all sequences in the offset range of the given node to node `to`.
    ///
    /// Returns a semiopen offset range in node `to`, or [`None`] if no such sequences exist.
    pub fn follow(&self, node: usize, range: &Range<usize>, to: usize) -> Option<Range<usize>> {
        self.record_for(node)?.follow(range, to)
    }

    /// Returns the first position in sequence `id`, or [`None`] if no such sequence exists.
    ///
    /// The return value is a pair (node identifier, offset in node).
    pub fn start(&self, id: usize) -> Option<(usize, usize)> {
        if id >= self.sequences() {
            return None;
        }
        let result = self.bwt[0].lf(id).unwrap();
        if result.0 == ENDMARKER { None } else { Some(result) }
    }

    /// Follows the sequence forward and returns the next position, or [`None`] if the sequence ends.
    ///
    /// The argument and the return value are pairs (node identifier, offset in node).
    pub fn forward(&self, pos: (usize, usize)) -> Option<(usize, usize)> {
        if !self.has_node(pos.0) {
            return None;
        }
        let result = self.record_for(pos.0)?.lf(pos.1)?;
        if result.0 == ENDMARKER { None } else { Some(result) }
    }

    /// Returns the sampled sequence identifier at the given position, or [`None`] if there is no sample.
    pub fn try_locate(&self, node: usize, i: usize) -> Option<usize> {
        self.record_for(node)?.sample_at(i)
    }
}

//-----------------------------------------------------------------------------

/// Construction.
impl DynamicGBWT {
    /// Inserts the paths in the text into the index as a single batch.
    ///
    /// The text is a concatenation of paths, each of which ends with the
    /// endmarker. The new paths receive identifiers starting from
    /// [`DynamicGBWT::sequences`] in the order they appear in the text.
    /// Inserting an empty text does nothing.
    ///
    /// # Panics
    ///
    /// Panics if the text is non-empty and does not end with the endmarker.
    pub fn insert(&mut self, text: &[usize]) {
        if text.is_empty() {
            return;
        }
        assert_eq!(*text.last().unwrap(), ENDMARKER, "DynamicGBWT: The text must end with an endmarker");
        self.insert_batch(text);
        self.recode_records();
    }

    /// Inserts the paths from the iterator in batches of at least `batch_size` nodes.
    ///
    /// A batch always ends at a path boundary. Batch size `0` inserts the
    /// entire input as a single batch.
    ///
    /// # Panics
    ///
    /// Panics if the input is non-empty and does not end with the endmarker.
    pub fn insert_from<I: IntoIterator<Item = usize>>(&mut self, iter: I, batch_size: usize) {
        let mut batch: Vec<usize> = Vec::new();
        for node in iter {
            batch.push(node);
            if node == ENDMARKER && batch_size > 0 && batch.len() >= batch_size {
                self.insert(&batch);
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.insert(&batch);
        }
    }

    /// Inserts the sequences from the other index into this index.
    ///
    /// The sequences are extracted in identifier order and inserted in
    /// batches of at most `batch_size` sequences (`0` inserts all sequences
    /// at once). The caller is responsible for the node id spaces: the
    /// result is equivalent to building one index from the concatenated
    /// inputs.
    pub fn merge(&mut self, other: &GBWT, batch_size: usize) {
        let batch_size = if batch_size == 0 { other.sequences() } else { batch_size };
        let mut batch: Vec<usize> = Vec::new();
        let mut in_batch = 0;
        for id in 0..other.sequences() {
            batch.extend(other.sequence(id));
            batch.push(ENDMARKER);
            in_batch += 1;
            if in_batch >= batch_size {
                self.insert(&batch);
                batch.clear();
                in_batch = 0;
            }
        }
        if !batch.is_empty() {
            self.insert(&batch);
        }
    }

    // Grows the effective alphabet to cover the given range of real nodes.
    //
    // The alphabet offset is determined by the first batch with real nodes
    // and can later only decrease.
    fn resize(&mut self, min_node: usize, max_node: usize) {
        if self.bwt.is_empty() {
            let offset = min_node - 1;
            let alphabet_size = max_node + 1;
            self.header.payload_mut().offset = offset;
            self.header.payload_mut().alphabet_size = alphabet_size;
            self.bwt.resize(alphabet_size - offset, DynamicRecord::default());
            return;
        }

        let old_offset = self.alphabet_offset();
        let new_offset = if self.alphabet_size() > 1 { cmp::min(old_offset, min_node - 1) } else { old_offset };
        if new_offset < old_offset {
            let count = old_offset - new_offset;
            drop(self.bwt.splice(1..1, std::iter::repeat_with(DynamicRecord::default).take(count)));
            self.header.payload_mut().offset = new_offset;
        }

        let new_sigma = cmp::max(self.alphabet_size(), max_node + 1);
        self.header.payload_mut().alphabet_size = new_sigma;
        let effective = new_sigma - self.alphabet_offset();
        if self.bwt.len() < effective {
            self.bwt.resize(effective, DynamicRecord::default());
        }
    }

    // Inserts a batch of sequences, maintaining the BWT invariant.
    //
    // All cursors advance in lockstep. Each round inserts one position for
    // every active cursor, updates the incoming counts of the destination
    // records, rebuilds the affected LF bases, and maps each cursor to its
    // position in the next record.
    fn insert_batch(&mut self, text: &[usize]) {
        // Grow the index to cover the node ids in the batch.
        let mut min_node = usize::MAX;
        let mut max_node = 0;
        for &node in text {
            if node != ENDMARKER {
                min_node = cmp::min(min_node, node);
                max_node = cmp::max(max_node, node);
            }
        }
        if max_node > 0 {
            self.resize(min_node, max_node);
        } else if self.bwt.is_empty() {
            self.header.payload_mut().alphabet_size = 1;
            self.bwt.push(DynamicRecord::default());
        }

        // Create a cursor for each new sequence, anchored at the end of the
        // endmarker record in sequence id order.
        let mut seqs: Vec<Sequence> = Vec::new();
        {
            let mut seq_id = self.sequences();
            let mut start = 0;
            for i in 0..text.len() {
                if text[i] == ENDMARKER {
                    seqs.push(Sequence {
                        id: seq_id,
                        curr: ENDMARKER,
                        next: text[start],
                        offset: seq_id,
                        pos: start,
                    });
                    seq_id += 1;
                    start = i + 1;
                }
            }
        }
        self.header.payload_mut().sequences += seqs.len();

        let mut iteration = 0;
        while !seqs.is_empty() {
            self.update_records(&seqs, iteration);
            self.increment_incoming(&seqs);
            self.rebuild_offsets(&seqs);
            self.advance_positions(&mut seqs, text);
            iteration += 1;
        }
    }

    // Splices the new positions into the records. The cursors are sorted by
    // (current node, offset), and the offsets are relative to the new body.
    fn update_records(&mut self, seqs: &[Sequence], iteration: usize) {
        let mut i = 0;
        while i < seqs.len() {
            let curr = seqs[i].curr;
            let comp = self.to_comp(curr);
            let record = &mut self.bwt[comp];
            let mut new_body = RunMerger::with_capacity(record.body.len() + 1);
            let mut new_samples: Vec<(usize, usize)> = Vec::with_capacity(record.ids.len() + 1);
            let mut old_runs = record.body.iter();
            let mut pending = old_runs.next().copied();
            let mut old_samples = record.ids.iter().peekable();
            let mut inserted = 0;
            while i < seqs.len() && seqs[i].curr == curr {
                let seq = &seqs[i];
                // Copy the old runs until the insertion position.
                while new_body.len() < seq.offset {
                    let (rank, len) = pending.unwrap();
                    let needed = seq.offset - new_body.len();
                    if len <= needed {
                        new_body.push(rank, len);
                        pending = old_runs.next().copied();
                    } else {
                        new_body.push(rank, needed);
                        pending = Some((rank, len - needed));
                    }
                }
                // Copy the old samples from before the insertion position.
                while let Some(&&(offset, id)) = old_samples.peek() {
                    if offset + inserted < seq.offset {
                        new_samples.push((offset + inserted, id));
                        old_samples.next();
                    } else {
                        break;
                    }
                }
                // Insert the new position, creating the outgoing edge if necessary.
                let outrank = match record.edge_to(seq.next) {
                    Some(rank) => rank,
                    None => {
                        record.outgoing.push((seq.next, 0));
                        record.outgoing.len() - 1
                    },
                };
                new_body.push(outrank, 1);
                // Sample the sequence at the anchor, at the last position,
                // and at every SAMPLE_INTERVAL positions on the path.
                if curr == ENDMARKER || seq.next == ENDMARKER || iteration % Self::SAMPLE_INTERVAL == 1 {
                    new_samples.push((seq.offset, seq.id));
                }
                inserted += 1;
                i += 1;
            }
            // Copy the remaining runs and samples.
            if let Some((rank, len)) = pending {
                new_body.push(rank, len);
            }
            for &(rank, len) in old_runs {
                new_body.push(rank, len);
            }
            for &(offset, id) in old_samples {
                new_samples.push((offset + inserted, id));
            }
            record.body_size = new_body.len();
            record.body = new_body.runs;
            record.ids = new_samples;
        }
        self.header.payload_mut().size += seqs.len();
    }

    // Adds the new positions to the incoming counts of the destination records.
    fn increment_incoming(&mut self, seqs: &[Sequence]) {
        for seq in seqs {
            let comp = self.to_comp(seq.next);
            self.bwt[comp].increment(seq.curr);
        }
    }

    // Rebuilds the LF base offsets of all edges into the records that
    // received new positions. The base for edge (v, w) is the total count
    // of incoming edges (u, w) with u < v in the record of w.
    fn rebuild_offsets(&mut self, seqs: &[Sequence]) {
        let mut targets: Vec<usize> = seqs.iter().map(|seq| seq.next).collect();
        targets.sort_unstable();
        targets.dedup();
        for to in targets {
            let comp = self.to_comp(to);
            let incoming = self.bwt[comp].incoming.clone();
            let mut offset = 0;
            for (from, count) in incoming {
                let from_comp = self.to_comp(from);
                let record = &mut self.bwt[from_comp];
                let rank = record.edge_to(to).unwrap();
                record.outgoing[rank].1 = offset;
                offset += count;
            }
        }
    }

    // Maps each cursor to its position in the next record and drops the
    // cursors that have reached the end of their path.
    fn advance_positions(&mut self, seqs: &mut Vec<Sequence>, text: &[usize]) {
        let bwt = &self.bwt;
        let offset = self.alphabet_offset();
        seqs.retain_mut(|seq| {
            if seq.next == ENDMARKER {
                return false;
            }
            let comp = if seq.curr == ENDMARKER { 0 } else { seq.curr - offset };
            seq.offset = bwt[comp].lf_to(seq.offset, seq.next).unwrap();
            seq.curr = seq.next;
            seq.pos += 1;
            seq.next = text[seq.pos];
            true
        });
        seqs.par_sort_unstable_by_key(|seq| (seq.curr, seq.offset));
    }

    // Sorts the outgoing edges of every record after a batch.
    fn recode_records(&mut self) {
        self.bwt.par_iter_mut().for_each(|record| record.recode());
    }

    // Compresses the index. The outgoing edges must be sorted, which
    // recode_records() guarantees between the batches.
    pub(crate) fn compress(&self) -> (BWT, DASamples) {
        let mut builder = BWTBuilder::new();
        for record in self.bwt.iter() {
            builder.append(&record.outgoing, &record.body);
        }
        (BWT::from(builder), DASamples::from(self.bwt.as_slice()))
    }

    // Rebuilds the dynamic index from the compressed structures.
    fn decompress(header: Header<GBWTPayload>, bwt: &BWT, samples: &DASamples) -> io::Result<DynamicGBWT> {
        let payload = *header.payload();
        let effective = if payload.alphabet_size == 0 { 0 } else { payload.alphabet_size - payload.offset };
        if bwt.len() != effective {
            return Err(Error::new(ErrorKind::InvalidData, "DynamicGBWT: Invalid number of records"));
        }

        let mut records: Vec<DynamicRecord> = vec![DynamicRecord::default(); effective];
        let mut total = 0;
        for comp in 0..bwt.len() {
            if let Some(record) = bwt.record(comp) {
                let mut outgoing: Vec<(usize, usize)> = Vec::with_capacity(record.outdegree());
                for rank in 0..record.outdegree() {
                    outgoing.push((record.successor(rank), record.offset(rank)));
                }
                let body: Vec<(usize, usize)> = record.run_iter().collect();
                let body_size = body.iter().map(|run| run.1).sum();
                let ids = samples.extract(comp, body_size);
                total += body_size;
                records[comp] = DynamicRecord {
                    body_size,
                    incoming: Vec::new(),
                    outgoing,
                    body,
                    ids,
                };
            }
        }
        if total != payload.size {
            return Err(Error::new(ErrorKind::InvalidData, "DynamicGBWT: Invalid total length"));
        }
        if effective > 0 && records[0].len() != payload.sequences {
            return Err(Error::new(ErrorKind::InvalidData, "DynamicGBWT: Invalid endmarker record length"));
        }

        // Rebuild the incoming edges from the record bodies.
        for comp in 0..records.len() {
            let node = if comp == 0 { ENDMARKER } else { payload.offset + comp };
            let mut counts: Vec<usize> = vec![0; records[comp].outdegree()];
            for &(rank, len) in records[comp].body.iter() {
                counts[rank] += len;
            }
            let edges: Vec<(usize, usize)> = records[comp].outgoing.iter()
                .map(|edge| edge.0)
                .zip(counts)
                .collect();
            for (to, count) in edges {
                if count > 0 {
                    let to_comp = if to == ENDMARKER { 0 } else { to - payload.offset };
                    records[to_comp].incoming.push((node, count));
                }
            }
        }

        Ok(DynamicGBWT {
            header,
            bwt: records,
        })
    }
}

//-----------------------------------------------------------------------------

impl Serialize for DynamicGBWT {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.header.serialize(writer)
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        let (bwt, samples) = self.compress();
        bwt.serialize(writer)?;
        samples.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let header = Header::<GBWTPayload>::load(reader)?;
        if let Err(msg) = header.validate() {
            return Err(Error::new(ErrorKind::InvalidData, msg));
        }
        let bwt = BWT::load(reader)?;
        let samples = DASamples::load(reader)?;
        Self::decompress(header, &bwt, &samples)
    }

    fn size_in_elements(&self) -> usize {
        let (bwt, samples) = self.compress();
        self.header.size_in_elements() + bwt.size_in_elements() + samples.size_in_elements()
    }
}

//-----------------------------------------------------------------------------
