//! Test fixture creation for the library and user databases
//!
//! The library rows are inserted with fixed identifiers via direct SQL so
//! tests can reference them through the constants module; the public store
//! API generates identifiers and is exercised by the admin tests instead.

use super::constants::*;
use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tempoteca_server::user::{SqliteUserStore, UserManager, UserRole};
use tempoteca_server::SqliteLibraryStore;

/// Creates a temporary library database seeded with two artists, two
/// genres, one album and three songs. Returns (temp_dir, db_path).
pub fn create_test_library() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("library.db");

    // Opening the store once creates the schema.
    let _store = SqliteLibraryStore::new(&db_path, 1)?;

    let conn = Connection::open(&db_path)?;

    conn.execute(
        "INSERT INTO artists (id, name) VALUES (?1, ?2)",
        params![ARTIST_NOVA_ID, "Nova"],
    )?;
    conn.execute(
        "INSERT INTO artists (id, name) VALUES (?1, ?2)",
        params![ARTIST_MIDNIGHT_ID, "The Midnight Collective"],
    )?;

    conn.execute(
        "INSERT INTO genres (id, name, description) VALUES (?1, ?2, ?3)",
        params![GENRE_HOUSE_ID, "House", "four on the floor"],
    )?;
    conn.execute(
        "INSERT INTO genres (id, name, description) VALUES (?1, ?2, NULL)",
        params![GENRE_DOWNTEMPO_ID, "Downtempo"],
    )?;

    conn.execute(
        "INSERT INTO albums (id, title, artist_id, release_year) VALUES (?1, ?2, ?3, 2021)",
        params![ALBUM_NIGHT_DRIVE_ID, "Night Drive", ARTIST_NOVA_ID],
    )?;
    conn.execute(
        "INSERT INTO album_artists (album_id, artist_id, is_primary) VALUES (?1, ?2, 1)",
        params![ALBUM_NIGHT_DRIVE_ID, ARTIST_NOVA_ID],
    )?;
    conn.execute(
        "INSERT INTO album_genres (album_id, genre_id) VALUES (?1, ?2)",
        params![ALBUM_NIGHT_DRIVE_ID, GENRE_HOUSE_ID],
    )?;

    let songs = [
        (SONG_HORIZON_ID, "Horizon", Some(ALBUM_NIGHT_DRIVE_ID), ARTIST_NOVA_ID, 128u16, 245u32),
        (SONG_ECHO_ID, "Echo", Some(ALBUM_NIGHT_DRIVE_ID), ARTIST_NOVA_ID, 95, 198),
        (SONG_ADRIFT_ID, "Adrift", None, ARTIST_MIDNIGHT_ID, 75, 312),
    ];
    for (id, title, album_id, artist_id, bpm, duration) in songs {
        conn.execute(
            "INSERT INTO songs (id, title, album_id, artist_id, bpm, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, title, album_id, artist_id, bpm, duration],
        )?;
    }
    conn.execute(
        "INSERT INTO song_genres (song_id, genre_id) VALUES (?1, ?2)",
        params![SONG_ADRIFT_ID, GENRE_DOWNTEMPO_ID],
    )?;

    Ok((dir, db_path))
}

/// Creates a temporary user database with one regular and one admin
/// account. Returns (temp_dir, db_path).
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("users.db");

    let store = Arc::new(SqliteUserStore::new(&db_path)?);
    let manager = UserManager::new(store);
    manager.sign_up(TEST_USER, TEST_PASS, Some("Listener"), UserRole::User)?;
    manager.sign_up(ADMIN_USER, ADMIN_PASS, Some("Curator"), UserRole::Admin)?;

    Ok((dir, db_path))
}
