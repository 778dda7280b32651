//! Levenshtein edit distance with unit costs.
//!
//! The engine ([`levenshtein_distance`] and its byte/char front ends) is a
//! pure function over two borrowed sequences. Byte-level comparison is the
//! default; see [`Granularity`]. The remaining modules load line-oriented
//! input, run all-pairs comparisons in parallel and write the results as
//! Arrow IPC or JSON ([`matrix::run_matrix`]).

pub mod error;
mod levenshtein;
pub mod matrix;
pub mod output;
pub mod pairwise;
pub mod records;

pub use error::{error_chain, DistanceError, MatrixError, Operand, OutputError, PairwiseError};
pub use levenshtein::{
    byte_distance, char_distance, distance, distance_from_bytes, levenshtein_distance, similarity,
    try_levenshtein_distance, Granularity,
};
pub use pairwise::{pairwise_distances, stream_pairwise, DistanceBatch, PairDistance, PairwiseConfig};
