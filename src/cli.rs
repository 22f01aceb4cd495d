//! C12 — CLI subcommands.
//!
//! `#[derive(Parser)]`/`#[derive(Subcommand)]` over named struct variants,
//! with `#[arg(short, long, default_value = ...)]` for the tunables that
//! have sane defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sabi")]
#[command(version)]
#[command(about = "Perceptual audio fingerprinting and similarity search", long_about = None)]
pub struct Cli {
    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fingerprint an audio file and add it to the index.
    Ingest {
        /// Path to the audio file.
        path: PathBuf,

        /// Title to store alongside the track.
        #[arg(short, long)]
        title: String,

        /// Artist name.
        #[arg(short, long)]
        artist: Option<String>,

        /// Id of the album this track belongs to, if known.
        #[arg(long)]
        album_id: Option<i32>,

        /// Comma-separated `k=v` tag pairs, e.g. `genre=jazz,year=1959`.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Fingerprint an audio clip and find similar indexed tracks.
    Query {
        /// Path to the audio clip.
        path: PathBuf,

        /// Minimum shared bands for a candidate to survive filtering;
        /// defaults to the engine's configured `threshold_tables`.
        #[arg(long)]
        threshold: Option<usize>,

        /// Cap on ranked tracks returned; defaults to the engine's
        /// configured `top_candidates`.
        #[arg(long)]
        top: Option<usize>,

        /// Bypass threshold filtering and score every candidate.
        #[arg(long)]
        search_all: bool,
    },

    /// List every indexed track.
    List {
        /// Restrict the listing to tracks by this artist.
        #[arg(long)]
        artist: Option<String>,
    },

    /// Count indexed tracks.
    Count,

    /// Drop every stored track, fingerprint, and hash bin.
    Reset,

    /// Serve the HTTP API.
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8080.
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
}
