//! The BWT stored as an array of compressed node records.
//!
//! # Examples
//!
//! ```
//! use gbwt_dynamic::bwt::{BWT, BWTBuilder};
//!
//! // Encode the BWT of paths (3, 4) and (3, 5) with alphabet offset 2.
//! // Record 0 is the endmarker record; records 1..4 are nodes 3..6.
//! let mut builder = BWTBuilder::new();
//! builder.append(&[(3, 0)], &[(0, 2)]);
//! builder.append(&[(4, 0), (5, 0)], &[(0, 1), (1, 1)]);
//! builder.append(&[(0, 0)], &[(0, 1)]);
//! builder.append(&[(0, 1)], &[(0, 1)]);
//!
//! let bwt = BWT::from(builder);
//! assert_eq!(bwt.len(), 4);
//!
//! let node_3 = bwt.record(1).unwrap();
//! assert_eq!(node_3.id(), 1);
//! assert_eq!(node_3.outdegree(), 2);
//! assert_eq!(node_3.successor(1), 5);
//! assert_eq!(node_3.offset(1), 0);
//! assert_eq!(node_3.len(), 2);
//! assert_eq!(node_3.lf(1), Some((5, 0)));
//! assert_eq!(node_3.follow(&(0..2), 4), Some(0..1));
//!
//! // Determine the length of the BWT by iterating over the records.
//! let bwt_len = bwt.iter().fold(0, |len, record| len + record.len());
//! assert_eq!(bwt_len, 6);
//! ```

use crate::support::{ByteCodeIter, Run, RunIter};
use crate::support;

use simple_sds::ops::{BitVec, Select};
use simple_sds::serialize::Serialize;
use simple_sds::sparse_vector::{SparseVector, SparseBuilder};

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::io::{Error, ErrorKind};
use std::iter::FusedIterator;
use std::ops::Range;
use std::{cmp, io};


//-----------------------------------------------------------------------------

/// The BWT encoded as a vector of bytes.
///
/// The encoding consists of `self.len()` concatenated node records.
/// Record identifiers are characters in the effective alphabet `0..self.len()`; they are not necessarily the same as the node identifiers.
/// There may be empty records that do not correspond to any node in the graph.
/// See the module-level documentation for an example.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BWT {
    index: SparseVector,
    data: Vec<u8>,
}

impl BWT {
    /// Returns the number of records in the BWT.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.count_ones()
    }

    /// Returns `true` if the BWT is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `i`th record, or `None` if the record is empty or does not exist.
    pub fn record(&self, i: usize) -> Option<Record> {
        if i >= self.len() {
            return None;
        }
        let mut iter = self.index.select_iter(i);
        let (_, start) = iter.next().unwrap();
        let limit = if i + 1 < self.len() { iter.next().unwrap().1 } else { self.data.len() };
        Record::new(i, &self.data[start..limit])
    }

    /// Returns an iterator over the records in the BWT.
    ///
    /// Note that the iterator skips empty records.
    pub fn iter(&self) -> RecordIter {
        RecordIter {
            parent: self,
            next: 0,
        }
    }
}

impl Serialize for BWT {
    fn serialize_header<T: io::Write>(&self, _: &mut T) -> io::Result<()> {
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.index.serialize(writer)?;
        self.data.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let index = SparseVector::load(reader)?;
        let data = Vec::<u8>::load(reader)?;
        if index.len() != data.len() {
            return Err(Error::new(ErrorKind::InvalidData, "BWT: Index / data length mismatch"));
        }
        Ok(BWT {
            index,
            data,
        })
    }

    fn size_in_elements(&self) -> usize {
        self.index.size_in_elements() + self.data.size_in_elements()
    }
}

impl From<BWTBuilder> for BWT {
    fn from(source: BWTBuilder) -> Self {
        let mut builder = SparseBuilder::new(source.encoder.len(), source.offsets.len()).unwrap();
        for offset in source.offsets.iter() {
            unsafe { builder.set_unchecked(*offset); }
        }
        BWT {
            index: SparseVector::try_from(builder).unwrap(),
            data: Vec::<u8>::from(source.encoder),
        }
    }
}

//-----------------------------------------------------------------------------

/// A structure for building the BWT by appending encoded node records.
///
/// The dynamic index uses this for compressing itself, and the records must
/// hence be appended in record identifier order, with the outgoing edges of
/// each record sorted by the destination node.
/// See the module-level documentation for an example.
#[derive(Clone, Debug, Default)]
pub struct BWTBuilder {
    offsets: Vec<usize>,
    encoder: Run,
}

impl BWTBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        BWTBuilder::default()
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` if the builder is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a new record to the BWT.
    ///
    /// The record consists of a list of edges and a list of runs.
    /// Each edge is a pair (destination node, BWT offset in the destination), with the edges sorted by destination.
    /// Each run is a pair `(rank, len)`, with `rank < edges.len()` and `len > 0`.
    pub fn append(&mut self, edges: &[(usize, usize)], runs: &[(usize, usize)]) {
        self.offsets.push(self.encoder.len());
        self.encoder.write_int(edges.len());
        let mut prev = 0;
        for (node, offset) in edges {
            self.encoder.write_int(*node - prev); self.encoder.write_int(*offset);
            prev = *node;
        }
        self.encoder.set_sigma(edges.len());
        for (rank, len) in runs {
            self.encoder.write(*rank, *len);
        }
    }
}

//-----------------------------------------------------------------------------

/// An iterator over the records in [`BWT`].
///
/// The type of `Item` is [`Record`].
/// Note that the iterator skips empty records.
/// See the module-level documentation for an example.
#[derive(Clone, Debug)]
pub struct RecordIter<'a> {
    parent: &'a BWT,
    // The first index we have not visited.
    next: usize,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.parent.len() {
            let result = self.parent.record(self.next);
            self.next += 1;
            if result.is_some() {
                return result;
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.parent.len() - self.next))
    }
}

impl<'a> FusedIterator for RecordIter<'a> {}

//-----------------------------------------------------------------------------

/// A partially decompressed node record.
///
/// The edges are decompressed eagerly, while the run-length encoded body is
/// borrowed from the underlying [`BWT`] and decoded by the queries on demand.
/// See the module-level documentation for an example.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    id: usize,
    edges: Vec<(usize, usize)>,
    bwt: &'a [u8],
}

impl<'a> Record<'a> {
    /// Returns a record corresponding to the byte slice, or `None` if the record would be empty.
    pub fn new(id: usize, bytes: &'a [u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }

        // Determine the outdegree.
        let mut iter = ByteCodeIter::new(bytes);
        let sigma = iter.next().unwrap();
        if sigma == 0 {
            return None;
        }

        // Decompress the edges.
        let mut edges: Vec<(usize, usize)> = Vec::with_capacity(sigma);
        let mut prev = 0;
        for _ in 0..sigma {
            let node = iter.next().unwrap() + prev;
            prev = node;
            let offset = iter.next().unwrap();
            edges.push((node, offset));
        }

        Some(Record {
            id,
            edges,
            bwt: &bytes[iter.offset()..],
        })
    }

    /// Returns the identifier of the record.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the outdegree of the node.
    #[inline]
    pub fn outdegree(&self) -> usize {
        self.edges.len()
    }

    /// Returns the successor node of rank `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.outdegree()`.
    #[inline]
    pub fn successor(&self, i: usize) -> usize {
        self.edges[i].0
    }

    /// Returns the BWT offset in the successor node of rank `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.outdegree()`.
    #[inline]
    pub fn offset(&self, i: usize) -> usize {
        self.edges[i].1
    }

    /// Returns the length of the record.
    ///
    /// This is somewhat slow, as it requires iterating over the run-length encoded body.
    /// Note that the length is always non-zero.
    pub fn len(&self) -> usize {
        let mut result = 0;
        for (_, len) in self.run_iter() {
            result += len;
        }
        result
    }

    /// Returns the number of runs in the body of the record.
    pub fn runs(&self) -> usize {
        self.run_iter().count()
    }

    /// Returns an iterator over the runs `(rank, len)` in the body of the record.
    pub fn run_iter(&self) -> RunIter<'a> {
        RunIter::new(self.bwt, self.edges.len())
    }

    /// Decompresses the record as a vector of (successor node, offset in successor) pairs.
    pub fn decompress(&self) -> Vec<(usize, usize)> {
        let mut edges = self.edges.clone();
        let mut result: Vec<(usize, usize)> = Vec::new();
        for (rank, len) in self.run_iter() {
            for _ in 0..len {
                result.push(edges[rank]);
                edges[rank].1 += 1;
            }
        }
        result
    }

    /// Follows the sequence at offset `i` and returns (successor node, offset in successor).
    ///
    /// A sequence that ends at offset `i` maps into the endmarker record.
    /// Returns [`None`] if offset `i` does not exist.
    pub fn lf(&self, i: usize) -> Option<(usize, usize)> {
        let mut edges = self.edges.clone();
        let mut offset = 0;
        for (rank, len) in self.run_iter() {
            if offset + len > i {
                edges[rank].1 += i - offset;
                return Some(edges[rank]);
            }
            edges[rank].1 += len;
            offset += len;
        }
        None
    }

    /// Follows the sequence at offset `i` to the given node and returns the offset in that node.
    ///
    /// The result is the destination of [`Self::lf`] restricted to sequences
    /// that continue with `node`: the number of such sequences before offset
    /// `i`, plus the BWT offset stored for the edge. Offsets at or beyond
    /// `self.len()` count all of them. Returns [`None`] if there is no edge
    /// to the given node.
    pub fn lf_to(&self, i: usize, node: usize) -> Option<usize> {
        let rank = self.edge_to(node)?;
        let mut result = self.offset(rank);
        let mut offset = 0;
        for (c, len) in self.run_iter() {
            if offset >= i {
                break;
            }
            if c == rank {
                result += cmp::min(len, i - offset);
            }
            offset += len;
        }
        Some(result)
    }

    /// Follows all sequences in the offset range to the given node.
    ///
    /// Returns a semiopen offset range in the destination node, or [`None`] if no such sequences exist.
    ///
    /// # Arguments
    ///
    /// * `range`: Offset range in the record.
    /// * `node`: Destination node.
    pub fn follow(&self, range: &Range<usize>, node: usize) -> Option<Range<usize>> {
        if range.is_empty() {
            return None;
        }
        let rank = self.edge_to(node)?;

        let mut result = self.offset(rank)..self.offset(rank);
        let mut offset = 0;
        for (c, len) in self.run_iter() {
            if c == rank {
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
    /// The successor is [`crate::ENDMARKER`] if the sequence ends at offset `i`.
    pub fn node_at(&self, i: usize) -> Option<usize> {
        let mut offset = 0;
        for (rank, len) in self.run_iter() {
            offset += len;
            if offset > i {
                return Some(self.successor(rank));
            }
        }
        None
    }

    /// Returns the rank of the edge to the given node, or [`None`] if there is no such edge.
    pub fn edge_to(&self, node: usize) -> Option<usize> {
        let mut low = 0;
        let mut high = self.outdegree();
        while low < high {
            let mid = low + (high - low) / 2;
            match node.cmp(&self.edges[mid].0) {
                Ordering::Less => high = mid,
                Ordering::Equal => return Some(mid),
                Ordering::Greater => low = mid + 1,
            }
        }
        None
    }
}

//-----------------------------------------------------------------------------
