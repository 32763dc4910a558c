//! # error
//!
//! why: surface caller and protocol contract breaches as unrecoverable faults
//! relations: returned by window.rs; benign no-ops never use this type
//! what: InvariantViolation

use thiserror::Error;

/// A broken window invariant. These indicate a bug in the caller or an
/// upstream protocol violation and must not be retried or swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("invalid range [{low}, {high}), marker index {marker_index}")]
    InvalidRange { low: u64, high: u64, marker_index: u64 },

    #[error("range high {high} beyond upper bound {upper_bound}")]
    RangeOutOfBounds { high: u64, upper_bound: u64 },

    #[error("merge called with no entries")]
    EmptyMerge,

    #[error("log index 0 is reserved")]
    ZeroIndex,

    #[error("entry {next} does not follow entry {prev}")]
    NonContiguous { prev: u64, next: u64 },

    #[error("marker index {marker_index}, first index {first_index}")]
    MarkerMismatch { marker_index: u64, first_index: u64 },
}
