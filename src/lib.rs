//! # GBWT: Graph BWT with incremental construction
//!
//! The GBWT is a run-length encoded FM-index storing a multiset of paths as
//! sequences of node identifiers. This crate implements both the dynamic
//! index used for building the structure and the compressed immutable index
//! used for queries. It is based on the [Simple-SDS](https://github.com/jltsiren/simple-sds) library.
//!
//! The dynamic index ([`DynamicGBWT`]) supports inserting batches of paths,
//! merging in the paths of another index, and compression into the static
//! form. The static index ([`GBWT`]) supports LF-mapping queries, subpath
//! search, sequence extraction, and a sampled `locate` operation that maps
//! a BWT position back to the identifier of the path passing through it.
//!
//! # References
//!
//! Jouni Sirén, Erik Garrison, Adam M. Novak, Benedict Paten, and Richard Durbin: **Haplotype-aware graph indexes**.\
//! Bioinformatics 36(2):400-407, 2020.
//! DOI: [10.1093/bioinformatics/btz575](https://doi.org/10.1093/bioinformatics/btz575)
//!
//! # Notes
//!
//! * See [Simple-SDS](https://github.com/jltsiren/simple-sds) for assumptions on the environment.
//! * Serialized indexes use the Simple-SDS data layout with an explicit
//!   format version in the header. The conventional file extension is `.gbwt`.

pub mod bwt;
pub mod dynamic;
pub mod gbwt;
pub mod headers;
pub mod samples;
pub mod support;

//-----------------------------------------------------------------------------

pub use crate::dynamic::DynamicGBWT;
pub use crate::gbwt::{GBWT, SearchState};

//-----------------------------------------------------------------------------

/// Node identifier `0` is used for technical purposes and does not exist in the graph.
///
/// Each path in the input text ends with the endmarker, and the endmarker
/// record anchors the starting positions of the paths.
pub const ENDMARKER: usize = 0;

/// File extension for serialized indexes.
pub const EXTENSION: &str = ".gbwt";

//-----------------------------------------------------------------------------
