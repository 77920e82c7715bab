//! GBWT: A run-length encoded FM-index storing paths as sequences of node identifiers.
//!
//! The GBWT was originally described in:
//!
//! > Sirén, Garrison, Novak, Paten, Durbin: **Haplotype-aware graph indexes**.
//! > Bioinformatics, 2020. DOI: [10.1093/bioinformatics/btz575](https://doi.org/10.1093/bioinformatics/btz575)
//!
//! The static index is built from a [`DynamicGBWT`] or loaded from a file.
//! It is immutable, and the queries can be used from multiple threads.
//!
//! # Examples
//!
//! ```
//! use gbwt_dynamic::{DynamicGBWT, GBWT};
//!
//! let mut dynamic = DynamicGBWT::new();
//! dynamic.insert(&[3, 4, 5, 0, 3, 4, 6, 0]);
//! let index = GBWT::from(&dynamic);
//!
//! assert_eq!(index.sequences(), 2);
//! assert_eq!(index.len(), 8);
//!
//! // Extract the first path.
//! let path: Vec<usize> = index.sequence(0).collect();
//! assert_eq!(path, vec![3, 4, 5]);
//!
//! // Search for paths passing through nodes 3 and 4.
//! let state = index.find(3).unwrap();
//! let state = index.extend(&state, 4).unwrap();
//! assert_eq!(state.len(), 2);
//!
//! // Map BWT positions back to path identifiers.
//! assert_eq!(index.locate(5, 0), Some(0));
//! assert_eq!(index.locate(6, 0), Some(1));
//! ```

use crate::bwt::{BWT, Record};
use crate::dynamic::DynamicGBWT;
use crate::headers::{Header, GBWTPayload};
use crate::samples::DASamples;
use crate::ENDMARKER;

use simple_sds::serialize::Serialize;

use std::io::{Error, ErrorKind};
use std::iter::FusedIterator;
use std::ops::Range;
use std::io;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// The immutable GBWT index storing a collection of paths space-efficiently.
///
/// The index stores integer sequences. Each integer is assumed to be a node
/// identifier, and each sequence is interpreted as a path in a graph. The
/// sequences can be extracted with LF-based navigation, subpaths can be
/// counted with [`GBWT::find`] / [`GBWT::extend`], and the sampled document
/// array maps BWT positions back to sequence identifiers with
/// [`GBWT::locate`]. See the module-level documentation for an example.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GBWT {
    header: Header<GBWTPayload>,
    bwt: BWT,
    samples: DASamples,
    endmarker: Vec<(usize, usize)>,
}

/// Index statistics.
impl GBWT {
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
        if !self.has_node(node) {
            return 0;
        }
        self.bwt.record(self.node_to_record(node)).map_or(0, |record| record.len())
    }

    // Converts a node id to a record id.
    #[inline]
    fn node_to_record(&self, node: usize) -> usize {
        if node == ENDMARKER { 0 } else { node - self.alphabet_offset() }
    }

    // Returns the record for the given node, or `None` if the node does not
    // exist or its record is empty. The endmarker record is accessible.
    fn record_for(&self, node: usize) -> Option<Record> {
        if node == ENDMARKER || self.has_node(node) {
            self.bwt.record(self.node_to_record(node))
        } else {
            None
        }
    }
}

//-----------------------------------------------------------------------------

/// Sequence navigation and LF queries.
impl GBWT {
    /// Returns the first position in sequence `id`, or [`None`] if no such sequence exists or the sequence is empty.
    ///
    /// The return value is a pair (node identifier, offset in node).
    pub fn start(&self, id: usize) -> Option<(usize, usize)> {
        if id >= self.endmarker.len() {
            return None;
        }
        let result = self.endmarker[id];
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

    /// Returns an iterator over sequence `id`.
    ///
    /// The iterator will be empty if no such sequence exists.
    pub fn sequence(&self, id: usize) -> SequenceIter {
        SequenceIter {
            parent: self,
            next: self.start(id),
        }
    }

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
}

//-----------------------------------------------------------------------------

/// Locate queries.
impl GBWT {
    /// Returns the sampled sequence identifier at the given position, or [`None`] if there is no sample.
    pub fn try_locate(&self, node: usize, i: usize) -> Option<usize> {
        if !(node == ENDMARKER || self.has_node(node)) {
            return None;
        }
        self.samples.try_locate(self.node_to_record(node), i)
    }

    /// Returns the identifier of the sequence at the given position, or [`None`] if the position does not exist.
    ///
    /// Walks the LF-mapping forward until it encounters a document array
    /// sample. Every sequence is sampled at its last position, so the walk
    /// takes at most [`DynamicGBWT::SAMPLE_INTERVAL`] steps.
    pub fn locate(&self, node: usize, i: usize) -> Option<usize> {
        if !(node == ENDMARKER || self.has_node(node)) {
            return None;
        }
        let mut pos = (node, i);
        loop {
            if let Some(id) = self.try_locate(pos.0, pos.1) {
                return Some(id);
            }
            if pos.0 == ENDMARKER {
                return if pos.1 < self.sequences() { Some(pos.1) } else { None };
            }
            pos = self.lf(pos.0, pos.1)?;
        }
    }
}

//-----------------------------------------------------------------------------

/// Subpath search.
impl GBWT {
    /// Returns a search state for all occurrences of the given node, or [`None`] if no such node exists.
    pub fn find(&self, node: usize) -> Option<SearchState> {
        if !self.has_node(node) {
            return None;
        }
        let record = self.bwt.record(self.node_to_record(node))?;
        Some(SearchState {
            node,
            range: 0..record.len(),
        })
    }

    /// Extends the search by the given node and returns the new search state, or [`None`] if no such extensions exist.
    ///
    /// Assume that the current search state corresponds to a set of subpath
    /// occurrences ending with the same node. This method takes all of those
    /// subpaths that continue with the given node, extends them with that
    /// node, and returns the new search state.
    ///
    /// # Arguments
    ///
    /// * `state`: A search state corresponding to a set of subpath occurrences.
    /// * `node`: Node to extend the subpaths with.
    pub fn extend(&self, state: &SearchState, node: usize) -> Option<SearchState> {
        if !self.has_node(node) {
            return None;
        }
        let record = self.bwt.record(self.node_to_record(state.node))?;
        let range = record.follow(&state.range, node)?;
        Some(SearchState {
            node,
            range,
        })
    }
}

//-----------------------------------------------------------------------------

impl Serialize for GBWT {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.header.serialize(writer)
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.bwt.serialize(writer)?;
        self.samples.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let header = Header::<GBWTPayload>::load(reader)?;
        if let Err(msg) = header.validate() {
            return Err(Error::new(ErrorKind::InvalidData, msg));
        }

        let bwt = BWT::load(reader)?;
        let payload = header.payload();
        let effective = if payload.alphabet_size == 0 { 0 } else { payload.alphabet_size - payload.offset };
        if bwt.len() != effective {
            return Err(Error::new(ErrorKind::InvalidData, "GBWT: Invalid number of records"));
        }

        let samples = DASamples::load(reader)?;

        // Decompress the endmarker, as the record can be poorly compressible.
        let endmarker = if bwt.is_empty() {
            Vec::new()
        } else {
            bwt.record(ENDMARKER).map_or(Vec::new(), |record| record.decompress())
        };
        if endmarker.len() != payload.sequences {
            return Err(Error::new(ErrorKind::InvalidData, "GBWT: Invalid endmarker record length"));
        }

        Ok(GBWT {
            header,
            bwt,
            samples,
            endmarker,
        })
    }

    fn size_in_elements(&self) -> usize {
        self.header.size_in_elements() + self.bwt.size_in_elements() + self.samples.size_in_elements()
    }
}

impl From<&DynamicGBWT> for GBWT {
    fn from(source: &DynamicGBWT) -> Self {
        let (bwt, samples) = source.compress();
        let endmarker = if bwt.is_empty() {
            Vec::new()
        } else {
            bwt.record(ENDMARKER).map_or(Vec::new(), |record| record.decompress())
        };
        GBWT {
            header: source.header(),
            bwt,
            samples,
            endmarker,
        }
    }
}

//-----------------------------------------------------------------------------

/// A state of subpath search in [`GBWT`].
///
/// The state consists of the last matched GBWT node identifier and an offset
/// range in that node. This information is equivalent to a BWT range in a
/// normal FM-index.
///
/// Note that because `SearchState` contains a [`Range`], which does not implement [`Copy`], states must often be passed by reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchState {
    /// GBWT node identifier for the last matched node.
    pub node: usize,
    /// Offset range in the node.
    pub range: Range<usize>,
}

impl SearchState {
    /// Returns the number of matching subpath occurrences (the length of the offset range).
    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Returns `true` if there are no matching subpath occurrences.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

//-----------------------------------------------------------------------------

/// An iterator over a sequence in [`GBWT`].
///
/// The type of `Item` is [`usize`].
///
/// # Examples
///
/// ```
/// use gbwt_dynamic::{DynamicGBWT, GBWT};
///
/// let mut dynamic = DynamicGBWT::new();
/// dynamic.insert(&[21, 22, 24, 25, 0]);
/// let index = GBWT::from(&dynamic);
///
/// let path: Vec<usize> = index.sequence(0).collect();
/// assert_eq!(path, vec![21, 22, 24, 25]);
/// ```
#[derive(Clone, Debug)]
pub struct SequenceIter<'a> {
    parent: &'a GBWT,
    // The next position.
    next: Option<(usize, usize)>,
}

impl<'a> Iterator for SequenceIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pos) = self.next {
            self.next = self.parent.forward(pos);
            Some(pos.0)
        } else {
            None
        }
    }
}

impl<'a> FusedIterator for SequenceIter<'a> {}

//-----------------------------------------------------------------------------
