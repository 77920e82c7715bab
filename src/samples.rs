//! Sparse document array samples for the `locate` queries.
//!
//! The GBWT does not store the document array, which maps each BWT position
//! to the identifier of the sequence passing through it. Instead, a sparse
//! subset of the positions is sampled during construction, and `locate`
//! walks the LF-mapping forward until it encounters a sample. [`DASamples`]
//! stores the samples over a virtual concatenation of the sampled records,
//! indexed with bitvectors over records and concatenated offsets.

use crate::dynamic::DynamicRecord;

use simple_sds::bit_vector::BitVector;
use simple_sds::int_vector::IntVector;
use simple_sds::ops::{Vector, Access, Push, BitVec, Rank, Select};
use simple_sds::raw_vector::{RawVector, AccessRaw};
use simple_sds::serialize::Serialize;
use simple_sds::sparse_vector::{SparseVector, SparseBuilder};
use simple_sds::bits;

use std::convert::TryFrom;
use std::io::{Error, ErrorKind};
use std::io;


//-----------------------------------------------------------------------------

/// Document array samples attached to a subset of BWT positions.
///
/// The structure consists of a plain bitvector marking the records that
/// contain samples, a sparse bitvector marking the start of each sampled
/// record in the virtual concatenation of their offset ranges, a sparse
/// bitvector marking the sampled offsets in the same concatenation, and a
/// packed array of the sampled sequence identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DASamples {
    records: BitVector,
    ranges: SparseVector,
    offsets: SparseVector,
    array: IntVector,
}

impl DASamples {
    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Returns `true` if there are no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of records that contain samples.
    #[inline]
    pub fn sampled_records(&self) -> usize {
        self.ranges.count_ones()
    }

    /// Returns the sampled sequence identifier at the given position, or `None` if there is no sample.
    ///
    /// # Arguments
    ///
    /// * `record`: Record identifier in the effective alphabet.
    /// * `offset`: BWT offset in the record.
    pub fn try_locate(&self, record: usize, offset: usize) -> Option<usize> {
        if record >= self.records.len() || !self.records.get(record) {
            return None;
        }
        let rank = self.records.rank(record);
        let (_, start) = self.ranges.select_iter(rank).next().unwrap();
        let pos = start + offset;
        if pos >= self.offsets.len() || !self.offsets.get(pos) {
            return None;
        }
        Some(self.array.get(self.offsets.rank(pos)) as usize)
    }

    /// Returns the samples in the given record as (offset, sequence id) pairs sorted by offset.
    ///
    /// # Arguments
    ///
    /// * `record`: Record identifier in the effective alphabet.
    /// * `len`: Length of the record.
    pub fn extract(&self, record: usize, len: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::new();
        if record >= self.records.len() || !self.records.get(record) {
            return result;
        }
        let rank = self.records.rank(record);
        let (_, start) = self.ranges.select_iter(rank).next().unwrap();
        for (sample_rank, pos) in self.offsets.select_iter(self.offsets.rank(start)) {
            if pos >= start + len {
                break;
            }
            result.push((pos - start, self.array.get(sample_rank) as usize));
        }
        result
    }
}

impl Serialize for DASamples {
    fn serialize_header<T: io::Write>(&self, _: &mut T) -> io::Result<()> {
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.records.serialize(writer)?;
        self.ranges.serialize(writer)?;
        self.offsets.serialize(writer)?;
        self.array.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let mut records = BitVector::load(reader)?;
        records.enable_rank();
        let ranges = SparseVector::load(reader)?;
        let offsets = SparseVector::load(reader)?;
        let array = IntVector::load(reader)?;
        if ranges.len() != offsets.len() {
            return Err(Error::new(ErrorKind::InvalidData, "DASamples: Range / offset universe mismatch"));
        }
        if ranges.count_ones() != records.count_ones() {
            return Err(Error::new(ErrorKind::InvalidData, "DASamples: Invalid number of sampled records"));
        }
        if offsets.count_ones() != array.len() {
            return Err(Error::new(ErrorKind::InvalidData, "DASamples: Invalid number of samples"));
        }
        Ok(DASamples {
            records,
            ranges,
            offsets,
            array,
        })
    }

    fn size_in_elements(&self) -> usize {
        self.records.size_in_elements() + self.ranges.size_in_elements() + self.offsets.size_in_elements() + self.array.size_in_elements()
    }
}

impl From<&[DynamicRecord]> for DASamples {
    fn from(bwt: &[DynamicRecord]) -> Self {
        // Determine the statistics and mark the sampled records.
        let mut sampled = 0;
        let mut range_len = 0;
        let mut sample_count = 0;
        let mut max_sample = 0;
        let mut raw = RawVector::with_len(bwt.len(), false);
        for (i, record) in bwt.iter().enumerate() {
            if record.samples() > 0 {
                sampled += 1;
                range_len += record.len();
                sample_count += record.samples();
                for (_, id) in record.sample_iter() {
                    max_sample = std::cmp::max(max_sample, id);
                }
                raw.set_bit(i, true);
            }
        }
        let mut records = BitVector::from(raw);
        records.enable_rank();

        // Build the bitvectors over the concatenated offset ranges and store the samples.
        let mut range_builder = SparseBuilder::new(range_len, sampled).unwrap();
        let mut offset_builder = SparseBuilder::new(range_len, sample_count).unwrap();
        let mut array = IntVector::with_capacity(sample_count, bits::bit_len(max_sample as u64)).unwrap();
        let mut offset = 0;
        for record in bwt.iter() {
            if record.samples() > 0 {
                unsafe { range_builder.set_unchecked(offset); }
                for (pos, id) in record.sample_iter() {
                    unsafe { offset_builder.set_unchecked(offset + pos); }
                    array.push(id as u64);
                }
                offset += record.len();
            }
        }

        DASamples {
            records,
            ranges: SparseVector::try_from(range_builder).unwrap(),
            offsets: SparseVector::try_from(offset_builder).unwrap(),
            array,
        }
    }
}

//-----------------------------------------------------------------------------
