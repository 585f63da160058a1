//! Library entity models.
//!
//! Plain records mirror the persisted rows; the `Resolved*` composites are
//! assembled at the store boundary so that handlers never deal with
//! loosely-shaped joined payloads.

use crate::bpm::{self, BpmColorRange};
use serde::{Deserialize, Serialize};

// =============================================================================
// Core Entities
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub created: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created: i64,
}

/// An album row. `artist_id` is the denormalized primary-artist reference
/// kept for single-artist queries; the full credited set lives in the
/// album_artists association records.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist_id: String,
    pub release_year: Option<u16>,
    pub cover_image_url: Option<String>,
    pub created: i64,
}

/// A song row. `album_id` is nullable: a song without an album is a single.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub album_id: Option<String>,
    pub artist_id: Option<String>,
    pub bpm: Option<u16>,
    pub key: Option<String>,
    pub duration_seconds: u32,
    pub created: i64,
}

/// Album-artist association record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AlbumArtist {
    pub artist_id: String,
    pub is_primary: bool,
}

// =============================================================================
// Write Payloads
// =============================================================================

/// Scalar album fields, used for both inserts and updates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlbumFields {
    pub title: String,
    pub artist_id: String,
    pub release_year: Option<u16>,
    pub cover_image_url: Option<String>,
}

/// Full scalar song fields, used for inserts and whole-row updates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SongFields {
    pub title: String,
    pub album_id: Option<String>,
    pub artist_id: Option<String>,
    pub bpm: Option<u16>,
    pub key: Option<String>,
    pub duration_seconds: u32,
}

// =============================================================================
// Resolved/Composite Types (API Responses)
// =============================================================================

/// Album with its primary artist expanded, for list views.
#[derive(Clone, Debug, Serialize)]
pub struct AlbumWithArtist {
    pub album: Album,
    pub artist: Option<Artist>,
}

/// Credited artist with the primary flag.
#[derive(Clone, Debug, Serialize)]
pub struct AlbumArtistDetail {
    pub artist: Artist,
    pub is_primary: bool,
}

/// Full album with credited artists, genres and owned songs.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedAlbum {
    pub album: Album,
    pub artists: Vec<AlbumArtistDetail>,
    pub genres: Vec<Genre>,
    pub songs: Vec<ResolvedSong>,
}

/// Song with its relations expanded and the tempo color attached.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedSong {
    pub song: Song,
    pub artist: Option<Artist>,
    pub album: Option<Album>,
    pub color: Option<&'static BpmColorRange>,
}

impl ResolvedSong {
    pub fn resolve(song: Song, artist: Option<Artist>, album: Option<Album>) -> Self {
        let color = song.bpm.and_then(|bpm| bpm::classify(bpm as f64));
        ResolvedSong {
            song,
            artist,
            album,
            color,
        }
    }
}
