//! Album and song save procedures.
//!
//! The admin forms hand their state over as drafts; this module validates
//! them and reconciles the persisted rows against the drafted state. There
//! is exactly one implementation of each procedure, shared by every entry
//! point.
//!
//! The multi-step writes here are NOT atomic: a step that fails aborts the
//! remaining steps but nothing already applied is rolled back. Callers get
//! the failing step's error and are expected to re-present the form.

mod album_editor;
mod song_editor;

pub use album_editor::{delete_album, save_album, AlbumDraft, ArtistSelection, SongEntry};
pub use song_editor::{save_song, SongDraft};

use thiserror::Error;

/// Draft validation failures. All of these are detected before any store
/// call is made.
#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("The title is required")]
    EmptyTitle,

    #[error("At least one artist must be selected")]
    NoArtists,

    #[error("One artist must be flagged as primary")]
    NoPrimaryArtist,

    #[error("Only one artist can be flagged as primary")]
    MultiplePrimaryArtists,

    #[error("Song entry {index} needs both a title and a BPM value")]
    IncompleteSong { index: usize },

    #[error("A BPM value is required")]
    MissingBpm,

    #[error("The release year must be a four digit year, got {0}")]
    InvalidReleaseYear(u16),
}

#[derive(Debug, Error)]
pub enum EditorError {
    /// The draft was rejected locally; no write was attempted.
    #[error(transparent)]
    Invalid(#[from] DraftError),

    /// A store operation failed; earlier steps of the procedure may
    /// already have been applied.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
