//! Error taxonomy. A plain `anyhow`/`unwrap` style leaves no room
//! throughout; this tagged enum is learned from the pack instead (e.g.
//! `bravo1goingdark-ucfp`'s crates, `ExpertVagabond-kino`'s `error.rs`),
//! for callers to branch on *why* an operation failed, so this is a tagged enum instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Fewer than `fingerprint_length` STFT frames were available.
    #[error("clip too short to fingerprint: only {frames} of the required {required} STFT frames")]
    AudioTooShort { frames: usize, required: usize },

    #[error("store read failed: {0}")]
    StoreRead(String),

    #[error("store write failed: {0}")]
    StoreWrite(String),

    /// `F`, `K`, `L`, `B`, or the permutation table disagree with what the
    /// database was built with.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<diesel::result::Error> for EngineError {
    fn from(e: diesel::result::Error) -> Self {
        EngineError::StoreRead(e.to_string())
    }
}

impl From<diesel::ConnectionError> for EngineError {
    fn from(e: diesel::ConnectionError) -> Self {
        EngineError::StoreWrite(e.to_string())
    }
}
