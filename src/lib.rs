//! Perceptual audio fingerprinting and similarity retrieval: PCM in,
//! Hamming-ranked track matches out, over a spectrogram -> Haar wavelet
//! -> MinHash -> LSH pipeline stored in Postgres.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod fingerprint;
pub mod minhash;
pub mod query;
pub mod repository;
pub mod schema;
pub mod server;
pub mod spectrogram;
pub mod store;
pub mod wavelet;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use repository::Engine;
