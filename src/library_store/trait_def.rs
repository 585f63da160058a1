//! LibraryStore trait definition.
//!
//! Abstracts the record collections the rest of the crate reads and
//! writes, so the editor and the server can run against the SQLite
//! implementation or an in-test stub.

use super::models::{
    Album, AlbumArtist, AlbumFields, AlbumWithArtist, Artist, Genre, ResolvedAlbum, ResolvedSong,
    Song, SongFields,
};
use anyhow::Result;

pub trait LibraryStore: Send + Sync {
    // =========================================================================
    // Artists
    // =========================================================================

    /// All artists, ordered by name.
    fn list_artists(&self) -> Result<Vec<Artist>>;

    fn get_artist(&self, id: &str) -> Result<Option<Artist>>;

    /// Creates an artist with a generated identifier and returns the row.
    fn create_artist(&self, name: &str) -> Result<Artist>;

    fn update_artist(&self, id: &str, name: &str) -> Result<()>;

    /// Deletes an artist and its own association rows.
    fn delete_artist(&self, id: &str) -> Result<()>;

    // =========================================================================
    // Genres
    // =========================================================================

    /// All genres, ordered by name.
    fn list_genres(&self) -> Result<Vec<Genre>>;

    fn get_genre(&self, id: &str) -> Result<Option<Genre>>;

    fn create_genre(&self, name: &str, description: Option<&str>) -> Result<Genre>;

    fn update_genre(&self, id: &str, name: &str, description: Option<&str>) -> Result<()>;

    fn delete_genre(&self, id: &str) -> Result<()>;

    // =========================================================================
    // Albums
    // =========================================================================

    /// All albums ordered by title, each with its primary artist expanded.
    fn list_albums(&self) -> Result<Vec<AlbumWithArtist>>;

    fn get_album(&self, id: &str) -> Result<Option<Album>>;

    /// Album with credited artists, genres and owned songs.
    fn get_resolved_album(&self, id: &str) -> Result<Option<ResolvedAlbum>>;

    /// Inserts an album with a generated identifier and returns the row.
    fn insert_album(&self, fields: &AlbumFields) -> Result<Album>;

    /// Updates the album's scalar fields.
    fn update_album(&self, id: &str, fields: &AlbumFields) -> Result<()>;

    /// Deletes the album row only. Dependent songs and association rows
    /// must already be gone; the store does not cascade this edge.
    fn delete_album(&self, id: &str) -> Result<()>;

    // =========================================================================
    // Album Associations
    // =========================================================================

    fn get_album_artists(&self, album_id: &str) -> Result<Vec<AlbumArtist>>;

    fn delete_album_artists(&self, album_id: &str) -> Result<()>;

    fn insert_album_artist(&self, album_id: &str, artist_id: &str, is_primary: bool)
        -> Result<()>;

    fn get_album_genre_ids(&self, album_id: &str) -> Result<Vec<String>>;

    fn delete_album_genres(&self, album_id: &str) -> Result<()>;

    fn insert_album_genre(&self, album_id: &str, genre_id: &str) -> Result<()>;

    // =========================================================================
    // Songs
    // =========================================================================

    /// All songs ordered by title, with relations and tempo color resolved.
    fn list_songs(&self) -> Result<Vec<ResolvedSong>>;

    fn get_song(&self, id: &str) -> Result<Option<Song>>;

    /// Songs with `min <= bpm <= max`, ordered by bpm.
    fn songs_by_bpm_range(&self, min: u16, max: u16) -> Result<Vec<ResolvedSong>>;

    /// Songs whose title contains the given fragment, ordered by title.
    fn search_songs(&self, title_fragment: &str) -> Result<Vec<ResolvedSong>>;

    /// Identifiers of the songs persisted under an album.
    fn album_song_ids(&self, album_id: &str) -> Result<Vec<String>>;

    /// Inserts a song with a generated identifier and returns the row.
    fn insert_song(&self, fields: &SongFields) -> Result<Song>;

    /// Updates all scalar song fields.
    fn update_song(&self, id: &str, fields: &SongFields) -> Result<()>;

    /// Updates the fields an album entry carries: title, tempo, key and
    /// the per-song artist reference.
    fn update_song_entry(
        &self,
        id: &str,
        title: &str,
        bpm: Option<u16>,
        key: Option<&str>,
        artist_id: Option<&str>,
    ) -> Result<()>;

    /// Deletes a song and its own association rows.
    fn delete_song(&self, id: &str) -> Result<()>;

    // =========================================================================
    // Song Associations
    // =========================================================================

    fn song_artist_ids(&self, song_id: &str) -> Result<Vec<String>>;

    fn delete_song_artists(&self, song_id: &str) -> Result<()>;

    fn insert_song_artist(&self, song_id: &str, artist_id: &str) -> Result<()>;

    fn song_genre_ids(&self, song_id: &str) -> Result<Vec<String>>;

    fn delete_song_genres(&self, song_id: &str) -> Result<()>;

    fn insert_song_genre(&self, song_id: &str, genre_id: &str) -> Result<()>;

    // =========================================================================
    // Counts
    // =========================================================================

    fn get_artists_count(&self) -> usize;

    fn get_albums_count(&self) -> usize;

    fn get_songs_count(&self) -> usize;
}
