use std::path::PathBuf;
use std::{error::Error as StdError, fmt, io};

use arrow::error::ArrowError;
use thiserror::Error;

/// Which of the two inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Left,
    Right,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Left => f.write_str("left"),
            Operand::Right => f.write_str("right"),
        }
    }
}

/// Errors that can occur while computing an edit distance.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DistanceError {
    /// Raw input was not valid UTF-8 under character granularity.
    #[error("{operand} input is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        /// The offending input.
        operand: Operand,
        /// Length of the longest valid prefix, in bytes.
        valid_up_to: usize,
    },

    /// The working rows could not be allocated.
    #[error("failed to allocate working rows of {requested} cells")]
    Allocation {
        /// Number of `usize` cells requested per row.
        requested: usize,
    },
}

/// Errors from a pairwise batch run.
#[derive(Debug, Error)]
pub enum PairwiseError {
    /// A single pair could not be compared.
    #[error("records {left} and {right} could not be compared")]
    Distance {
        /// Index of the first record of the pair.
        left: u32,
        /// Index of the second record of the pair.
        right: u32,
        /// Why the engine refused the pair.
        #[source]
        source: DistanceError,
    },

    /// A record was not valid UTF-8 under character granularity.
    #[error("record {record} is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidRecord {
        /// Index of the offending record.
        record: u32,
        /// Length of the longest valid prefix, in bytes.
        valid_up_to: usize,
    },

    /// Record indices are stored as `u32`.
    #[error("{0} records exceed the u32 index range")]
    TooManyRecords(usize),

    /// The receiving end of the batch channel hung up.
    #[error("worker failed to send batch: writer is gone")]
    Disconnected,
}

/// Errors from writing results to a sink.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("arrow IPC error")]
    Arrow(#[from] ArrowError),

    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    #[error("I/O error")]
    Io(#[from] io::Error),
}

/// Errors from a file-to-file all-pairs run.
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("failed to load records")]
    Input(#[source] io::Error),

    #[error("failed to create output file '{}'", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The finished output could not be moved into place.
    #[error("failed to move finished output to '{}'", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output")]
    Output(#[from] OutputError),

    #[error("pairwise computation failed")]
    Pairwise(#[from] PairwiseError),

    #[error("writer thread panicked: {0}")]
    WriterPanicked(String),
}

/// Renders an error followed by its `source()` chain, `: `-separated.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
