//! Error types for filter persistence

use thiserror::Error;

/// Errors raised while decoding, loading or saving a filter
///
/// Membership operations never fail; they report through their boolean results instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("expected bytes to be a multiple of 4, got {len}")]
    Format { len: usize },

    #[error("bucket count must be a non-zero power of two, got {buckets}")]
    NotPowerOfTwo { buckets: usize },

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persist: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl Error {
    /// True when the input bytes could not describe a filter table
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format { .. } | Error::NotPowerOfTwo { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
