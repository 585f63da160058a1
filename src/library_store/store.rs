//! SQLite-backed library store implementation.

use super::models::*;
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::LibraryStore;
use super::validation::{validate_album_fields, validate_genre_name, validate_song_fields};
use crate::sqlite_persistence::migrate_to_latest;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

const SONG_COLUMNS: &str =
    "id, title, album_id, artist_id, bpm, key, duration_seconds, created";

/// SQLite-backed library store with a small read pool and a single write
/// connection.
#[derive(Clone)]
pub struct SqliteLibraryStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

impl SqliteLibraryStore {
    /// Opens (and migrates if needed) the library database.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `read_pool_size` - Number of connections for concurrent reads
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open library database")?;

        migrate_to_latest(&mut write_conn, "library db", LIBRARY_VERSIONED_SCHEMAS)?;

        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.execute("PRAGMA foreign_keys = ON;", [])?;

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        let store = SqliteLibraryStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        };

        info!(
            "Opened library: {} artists, {} albums, {} songs",
            store.get_artists_count(),
            store.get_albums_count(),
            store.get_songs_count()
        );

        Ok(store)
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    // =========================================================================
    // Row Parsing Helpers
    // =========================================================================

    fn parse_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: row.get(0)?,
            name: row.get(1)?,
            created: row.get(2)?,
        })
    }

    fn parse_genre_row(row: &rusqlite::Row) -> rusqlite::Result<Genre> {
        Ok(Genre {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created: row.get(3)?,
        })
    }

    fn parse_album_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
        Ok(Album {
            id: row.get(0)?,
            title: row.get(1)?,
            artist_id: row.get(2)?,
            release_year: row.get(3)?,
            cover_image_url: row.get(4)?,
            created: row.get(5)?,
        })
    }

    fn parse_song_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        Ok(Song {
            id: row.get(0)?,
            title: row.get(1)?,
            album_id: row.get(2)?,
            artist_id: row.get(3)?,
            bpm: row.get(4)?,
            key: row.get(5)?,
            duration_seconds: row.get(6)?,
            created: row.get(7)?,
        })
    }

    fn artist_by_id(conn: &Connection, id: &str) -> Result<Option<Artist>> {
        let artist = conn
            .query_row(
                "SELECT id, name, created FROM artists WHERE id = ?1",
                params![id],
                Self::parse_artist_row,
            )
            .optional()?;
        Ok(artist)
    }

    fn album_by_id(conn: &Connection, id: &str) -> Result<Option<Album>> {
        let album = conn
            .query_row(
                "SELECT id, title, artist_id, release_year, cover_image_url, created
                 FROM albums WHERE id = ?1",
                params![id],
                Self::parse_album_row,
            )
            .optional()?;
        Ok(album)
    }

    /// Expands a song's artist and album references and attaches the tempo
    /// color. Runs on an already-held connection to avoid re-entering the
    /// pool.
    fn resolve_song(conn: &Connection, song: Song) -> Result<ResolvedSong> {
        let artist = match &song.artist_id {
            Some(artist_id) => Self::artist_by_id(conn, artist_id)?,
            None => None,
        };
        let album = match &song.album_id {
            Some(album_id) => Self::album_by_id(conn, album_id)?,
            None => None,
        };
        Ok(ResolvedSong::resolve(song, artist, album))
    }

    fn resolve_songs(conn: &Connection, songs: Vec<Song>) -> Result<Vec<ResolvedSong>> {
        songs
            .into_iter()
            .map(|song| Self::resolve_song(conn, song))
            .collect()
    }

    fn count(&self, table: &str) -> usize {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        locked
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
                r.get::<_, i64>(0)
            })
            .unwrap_or(0) as usize
    }
}

impl LibraryStore for SqliteLibraryStore {
    // =========================================================================
    // Artists
    // =========================================================================

    fn list_artists(&self) -> Result<Vec<Artist>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt =
            locked.prepare_cached("SELECT id, name, created FROM artists ORDER BY name")?;
        let artists = stmt
            .query_map([], Self::parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn get_artist(&self, id: &str) -> Result<Option<Artist>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        Self::artist_by_id(&locked, id)
    }

    fn create_artist(&self, name: &str) -> Result<Artist> {
        if name.trim().is_empty() {
            bail!("Artist name must not be empty");
        }
        let id = Self::generate_id();
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artists (id, name) VALUES (?1, ?2)",
            params![id, name.trim()],
        )?;
        Self::artist_by_id(&conn, &id)?
            .with_context(|| format!("Artist {} vanished right after insert", id))
    }

    fn update_artist(&self, id: &str, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            bail!("Artist name must not be empty");
        }
        let conn = self.write_conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE artists SET name = ?2 WHERE id = ?1",
            params![id, name.trim()],
        )?;
        if affected == 0 {
            bail!("Artist {} not found", id);
        }
        Ok(())
    }

    fn delete_artist(&self, id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("DELETE FROM album_artists WHERE artist_id = ?1", params![id])?;
        conn.execute("DELETE FROM song_artists WHERE artist_id = ?1", params![id])?;
        conn.execute("DELETE FROM artists WHERE id = ?1", params![id])?;
        Ok(())
    }

    // =========================================================================
    // Genres
    // =========================================================================

    fn list_genres(&self) -> Result<Vec<Genre>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt = locked
            .prepare_cached("SELECT id, name, description, created FROM genres ORDER BY name")?;
        let genres = stmt
            .query_map([], Self::parse_genre_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(genres)
    }

    fn get_genre(&self, id: &str) -> Result<Option<Genre>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let genre = locked
            .query_row(
                "SELECT id, name, description, created FROM genres WHERE id = ?1",
                params![id],
                Self::parse_genre_row,
            )
            .optional()?;
        Ok(genre)
    }

    fn create_genre(&self, name: &str, description: Option<&str>) -> Result<Genre> {
        validate_genre_name(name)?;
        let id = Self::generate_id();
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO genres (id, name, description) VALUES (?1, ?2, ?3)",
            params![id, name.trim(), description],
        )?;
        let genre = conn
            .query_row(
                "SELECT id, name, description, created FROM genres WHERE id = ?1",
                params![id],
                Self::parse_genre_row,
            )
            .optional()?;
        genre.with_context(|| format!("Genre {} vanished right after insert", id))
    }

    fn update_genre(&self, id: &str, name: &str, description: Option<&str>) -> Result<()> {
        validate_genre_name(name)?;
        let conn = self.write_conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE genres SET name = ?2, description = ?3 WHERE id = ?1",
            params![id, name.trim(), description],
        )?;
        if affected == 0 {
            bail!("Genre {} not found", id);
        }
        Ok(())
    }

    fn delete_genre(&self, id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("DELETE FROM album_genres WHERE genre_id = ?1", params![id])?;
        conn.execute("DELETE FROM song_genres WHERE genre_id = ?1", params![id])?;
        conn.execute("DELETE FROM genres WHERE id = ?1", params![id])?;
        Ok(())
    }

    // =========================================================================
    // Albums
    // =========================================================================

    fn list_albums(&self) -> Result<Vec<AlbumWithArtist>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt = locked.prepare_cached(
            "SELECT id, title, artist_id, release_year, cover_image_url, created
             FROM albums ORDER BY title",
        )?;
        let albums = stmt
            .query_map([], Self::parse_album_row)?
            .collect::<Result<Vec<_>, _>>()?;

        albums
            .into_iter()
            .map(|album| {
                let artist = Self::artist_by_id(&locked, &album.artist_id)?;
                Ok(AlbumWithArtist { album, artist })
            })
            .collect()
    }

    fn get_album(&self, id: &str) -> Result<Option<Album>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        Self::album_by_id(&locked, id)
    }

    fn get_resolved_album(&self, id: &str) -> Result<Option<ResolvedAlbum>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();

        let album = match Self::album_by_id(&locked, id)? {
            Some(album) => album,
            None => return Ok(None),
        };

        let mut artists_stmt = locked.prepare_cached(
            "SELECT a.id, a.name, a.created, aa.is_primary
             FROM album_artists aa JOIN artists a ON a.id = aa.artist_id
             WHERE aa.album_id = ?1
             ORDER BY aa.is_primary DESC, a.name",
        )?;
        let artists = artists_stmt
            .query_map(params![id], |row| {
                Ok(AlbumArtistDetail {
                    artist: Artist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created: row.get(2)?,
                    },
                    is_primary: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut genres_stmt = locked.prepare_cached(
            "SELECT g.id, g.name, g.description, g.created
             FROM album_genres ag JOIN genres g ON g.id = ag.genre_id
             WHERE ag.album_id = ?1
             ORDER BY g.name",
        )?;
        let genres = genres_stmt
            .query_map(params![id], Self::parse_genre_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut songs_stmt = locked.prepare_cached(&format!(
            "SELECT {} FROM songs WHERE album_id = ?1 ORDER BY rowid",
            SONG_COLUMNS
        ))?;
        let songs = songs_stmt
            .query_map(params![id], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let songs = Self::resolve_songs(&locked, songs)?;

        Ok(Some(ResolvedAlbum {
            album,
            artists,
            genres,
            songs,
        }))
    }

    fn insert_album(&self, fields: &AlbumFields) -> Result<Album> {
        validate_album_fields(fields)?;
        let id = Self::generate_id();
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO albums (id, title, artist_id, release_year, cover_image_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                fields.title.trim(),
                fields.artist_id,
                fields.release_year,
                fields.cover_image_url
            ],
        )?;
        Self::album_by_id(&conn, &id)?
            .with_context(|| format!("Album {} vanished right after insert", id))
    }

    fn update_album(&self, id: &str, fields: &AlbumFields) -> Result<()> {
        validate_album_fields(fields)?;
        let conn = self.write_conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE albums
             SET title = ?2, artist_id = ?3, release_year = ?4, cover_image_url = ?5
             WHERE id = ?1",
            params![
                id,
                fields.title.trim(),
                fields.artist_id,
                fields.release_year,
                fields.cover_image_url
            ],
        )?;
        if affected == 0 {
            bail!("Album {} not found", id);
        }
        Ok(())
    }

    fn delete_album(&self, id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("DELETE FROM albums WHERE id = ?1", params![id])?;
        Ok(())
    }

    // =========================================================================
    // Album Associations
    // =========================================================================

    fn get_album_artists(&self, album_id: &str) -> Result<Vec<AlbumArtist>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt = locked.prepare_cached(
            "SELECT artist_id, is_primary FROM album_artists
             WHERE album_id = ?1 ORDER BY is_primary DESC",
        )?;
        let rows = stmt
            .query_map(params![album_id], |row| {
                Ok(AlbumArtist {
                    artist_id: row.get(0)?,
                    is_primary: row.get::<_, i64>(1)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn delete_album_artists(&self, album_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "DELETE FROM album_artists WHERE album_id = ?1",
            params![album_id],
        )?;
        Ok(())
    }

    fn insert_album_artist(
        &self,
        album_id: &str,
        artist_id: &str,
        is_primary: bool,
    ) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO album_artists (album_id, artist_id, is_primary) VALUES (?1, ?2, ?3)",
            params![album_id, artist_id, is_primary],
        )?;
        Ok(())
    }

    fn get_album_genre_ids(&self, album_id: &str) -> Result<Vec<String>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt =
            locked.prepare_cached("SELECT genre_id FROM album_genres WHERE album_id = ?1")?;
        let ids = stmt
            .query_map(params![album_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn delete_album_genres(&self, album_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "DELETE FROM album_genres WHERE album_id = ?1",
            params![album_id],
        )?;
        Ok(())
    }

    fn insert_album_genre(&self, album_id: &str, genre_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO album_genres (album_id, genre_id) VALUES (?1, ?2)",
            params![album_id, genre_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Songs
    // =========================================================================

    fn list_songs(&self) -> Result<Vec<ResolvedSong>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt = locked.prepare_cached(&format!(
            "SELECT {} FROM songs ORDER BY title",
            SONG_COLUMNS
        ))?;
        let songs = stmt
            .query_map([], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Self::resolve_songs(&locked, songs)
    }

    fn get_song(&self, id: &str) -> Result<Option<Song>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let song = locked
            .query_row(
                &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
                params![id],
                Self::parse_song_row,
            )
            .optional()?;
        Ok(song)
    }

    fn songs_by_bpm_range(&self, min: u16, max: u16) -> Result<Vec<ResolvedSong>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt = locked.prepare_cached(&format!(
            "SELECT {} FROM songs WHERE bpm >= ?1 AND bpm <= ?2 ORDER BY bpm",
            SONG_COLUMNS
        ))?;
        let songs = stmt
            .query_map(params![min, max], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Self::resolve_songs(&locked, songs)
    }

    fn search_songs(&self, title_fragment: &str) -> Result<Vec<ResolvedSong>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let pattern = format!(
            "%{}%",
            title_fragment.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        let mut stmt = locked.prepare_cached(&format!(
            "SELECT {} FROM songs WHERE title LIKE ?1 ESCAPE '\\' ORDER BY title",
            SONG_COLUMNS
        ))?;
        let songs = stmt
            .query_map(params![pattern], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Self::resolve_songs(&locked, songs)
    }

    fn album_song_ids(&self, album_id: &str) -> Result<Vec<String>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt = locked
            .prepare_cached("SELECT id FROM songs WHERE album_id = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![album_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn insert_song(&self, fields: &SongFields) -> Result<Song> {
        validate_song_fields(fields)?;
        let id = Self::generate_id();
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO songs (id, title, album_id, artist_id, bpm, key, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                fields.title.trim(),
                fields.album_id,
                fields.artist_id,
                fields.bpm,
                fields.key,
                fields.duration_seconds
            ],
        )?;
        let song = conn
            .query_row(
                &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
                params![id],
                Self::parse_song_row,
            )
            .optional()?;
        song.with_context(|| format!("Song {} vanished right after insert", id))
    }

    fn update_song(&self, id: &str, fields: &SongFields) -> Result<()> {
        validate_song_fields(fields)?;
        let conn = self.write_conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE songs
             SET title = ?2, album_id = ?3, artist_id = ?4, bpm = ?5, key = ?6,
                 duration_seconds = ?7
             WHERE id = ?1",
            params![
                id,
                fields.title.trim(),
                fields.album_id,
                fields.artist_id,
                fields.bpm,
                fields.key,
                fields.duration_seconds
            ],
        )?;
        if affected == 0 {
            bail!("Song {} not found", id);
        }
        Ok(())
    }

    fn update_song_entry(
        &self,
        id: &str,
        title: &str,
        bpm: Option<u16>,
        key: Option<&str>,
        artist_id: Option<&str>,
    ) -> Result<()> {
        if title.trim().is_empty() {
            bail!("Song title must not be empty");
        }
        let conn = self.write_conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE songs SET title = ?2, bpm = ?3, key = ?4, artist_id = ?5 WHERE id = ?1",
            params![id, title.trim(), bpm, key, artist_id],
        )?;
        if affected == 0 {
            bail!("Song {} not found", id);
        }
        Ok(())
    }

    fn delete_song(&self, id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("DELETE FROM song_artists WHERE song_id = ?1", params![id])?;
        conn.execute("DELETE FROM song_genres WHERE song_id = ?1", params![id])?;
        conn.execute("DELETE FROM songs WHERE id = ?1", params![id])?;
        Ok(())
    }

    // =========================================================================
    // Song Associations
    // =========================================================================

    fn song_artist_ids(&self, song_id: &str) -> Result<Vec<String>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt =
            locked.prepare_cached("SELECT artist_id FROM song_artists WHERE song_id = ?1")?;
        let ids = stmt
            .query_map(params![song_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn delete_song_artists(&self, song_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "DELETE FROM song_artists WHERE song_id = ?1",
            params![song_id],
        )?;
        Ok(())
    }

    fn insert_song_artist(&self, song_id: &str, artist_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO song_artists (song_id, artist_id) VALUES (?1, ?2)",
            params![song_id, artist_id],
        )?;
        Ok(())
    }

    fn song_genre_ids(&self, song_id: &str) -> Result<Vec<String>> {
        let conn = self.get_read_conn();
        let locked = conn.lock().unwrap();
        let mut stmt =
            locked.prepare_cached("SELECT genre_id FROM song_genres WHERE song_id = ?1")?;
        let ids = stmt
            .query_map(params![song_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn delete_song_genres(&self, song_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "DELETE FROM song_genres WHERE song_id = ?1",
            params![song_id],
        )?;
        Ok(())
    }

    fn insert_song_genre(&self, song_id: &str, genre_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO song_genres (song_id, genre_id) VALUES (?1, ?2)",
            params![song_id, genre_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Counts
    // =========================================================================

    fn get_artists_count(&self) -> usize {
        self.count("artists")
    }

    fn get_albums_count(&self) -> usize {
        self.count("albums")
    }

    fn get_songs_count(&self) -> usize {
        self.count("songs")
    }
}
