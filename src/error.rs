use std::path::PathBuf;

use thiserror::Error;

/// Errors raised during a verification run.
///
/// "Safe" and "unsafe" are verdicts, not errors; everything here aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("solver failure: {0}")]
    Solver(String),

    #[error("cannot parse solver response `{response}`: {reason}")]
    Parse { response: String, reason: String },

    #[error("solver returned unknown")]
    Unknown,

    #[error("solver was asked for an interpolant but the query is not unsat")]
    NotUnsat,

    #[error("refinement of the trace ending at location {location} found no new predicates")]
    PrecisionInsufficient { location: usize },

    #[error("refinement limit of {0} rounds reached")]
    RefinementLimit(usize),

    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    #[error("cannot write path formula to {path}: {source}")]
    Dump {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
