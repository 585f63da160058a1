//! The album save procedure.
//!
//! Reconciles an album draft against the persisted state: scalar fields
//! are updated in place, the artist and genre association sets are
//! replaced wholesale, and the owned song rows are diffed by identifier.

use super::{DraftError, EditorError};
use crate::library_store::{AlbumFields, LibraryStore, SongFields};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An artist picked in the album form, with its primary flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtistSelection {
    pub artist_id: String,
    pub is_primary: bool,
}

/// One song row of the album form. `id` is `None` for entries added in
/// this editing session; entries loaded from the store carry their
/// persisted identifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SongEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub bpm: Option<u16>,
    #[serde(default)]
    pub key: Option<String>,
    /// Per-song artist override; falls back to the album's primary artist.
    #[serde(default)]
    pub artist_id: Option<String>,
}

/// The full desired state of an album as edited in the form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlbumDraft {
    pub title: String,
    #[serde(default)]
    pub release_year: Option<u16>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    pub artists: Vec<ArtistSelection>,
    #[serde(default)]
    pub genre_ids: Vec<String>,
    #[serde(default)]
    pub songs: Vec<SongEntry>,
}

/// Checks the draft preconditions and returns the primary artist id.
fn validate_album_draft(draft: &AlbumDraft) -> Result<String, DraftError> {
    if draft.title.trim().is_empty() {
        return Err(DraftError::EmptyTitle);
    }
    if draft.artists.is_empty() {
        return Err(DraftError::NoArtists);
    }
    let mut primaries = draft.artists.iter().filter(|a| a.is_primary);
    let primary = match primaries.next() {
        None => return Err(DraftError::NoPrimaryArtist),
        Some(first) => {
            if primaries.next().is_some() {
                return Err(DraftError::MultiplePrimaryArtists);
            }
            first
        }
    };
    if let Some(year) = draft.release_year {
        if !(1000..=9999).contains(&year) {
            return Err(DraftError::InvalidReleaseYear(year));
        }
    }
    for (index, song) in draft.songs.iter().enumerate() {
        if song.title.trim().is_empty() || song.bpm.is_none() {
            return Err(DraftError::IncompleteSong { index });
        }
    }
    Ok(primary.artist_id.clone())
}

/// Persists an album draft.
///
/// With `existing_id` set, the persisted album is brought in line with the
/// draft; otherwise a new album is created. Returns the album id. Steps
/// run in order and the first failing store call aborts the rest; already
/// applied steps are not rolled back.
pub fn save_album(
    store: &dyn LibraryStore,
    existing_id: Option<&str>,
    draft: &AlbumDraft,
) -> Result<String, EditorError> {
    let primary_artist_id = validate_album_draft(draft)?;

    let fields = AlbumFields {
        title: draft.title.trim().to_string(),
        artist_id: primary_artist_id.clone(),
        release_year: draft.release_year,
        cover_image_url: draft.cover_image_url.clone(),
    };

    let album_id = match existing_id {
        Some(id) => {
            store.update_album(id, &fields)?;
            id.to_string()
        }
        None => store.insert_album(&fields)?.id,
    };

    // Replace both association sets wholesale.
    if existing_id.is_some() {
        store.delete_album_artists(&album_id)?;
    }
    for selection in &draft.artists {
        store.insert_album_artist(&album_id, &selection.artist_id, selection.is_primary)?;
    }

    if existing_id.is_some() {
        store.delete_album_genres(&album_id)?;
    }
    for genre_id in &draft.genre_ids {
        store.insert_album_genre(&album_id, genre_id)?;
    }

    if existing_id.is_some() {
        sync_album_songs(store, &album_id, &primary_artist_id, &draft.songs)?;
    } else {
        for entry in &draft.songs {
            insert_song_entry(store, &album_id, &primary_artist_id, entry)?;
        }
    }

    Ok(album_id)
}

/// Diffs the drafted song entries against the persisted rows: rows absent
/// from the draft are deleted, surviving entries are updated in place, and
/// entries without an identifier are inserted.
fn sync_album_songs(
    store: &dyn LibraryStore,
    album_id: &str,
    primary_artist_id: &str,
    entries: &[SongEntry],
) -> Result<(), EditorError> {
    let persisted_ids = store.album_song_ids(album_id)?;

    let kept_ids: HashSet<&str> = entries
        .iter()
        .filter_map(|entry| entry.id.as_deref())
        .collect();

    for song_id in persisted_ids.iter().filter(|id| !kept_ids.contains(id.as_str())) {
        store.delete_song(song_id)?;
    }

    for entry in entries.iter().filter(|entry| entry.id.is_some()) {
        let id = entry.id.as_deref().unwrap();
        let artist_id = entry.artist_id.as_deref().unwrap_or(primary_artist_id);
        store.update_song_entry(
            id,
            entry.title.trim(),
            entry.bpm,
            entry.key.as_deref(),
            Some(artist_id),
        )?;
    }

    for entry in entries.iter().filter(|entry| entry.id.is_none()) {
        insert_song_entry(store, album_id, primary_artist_id, entry)?;
    }

    Ok(())
}

fn insert_song_entry(
    store: &dyn LibraryStore,
    album_id: &str,
    primary_artist_id: &str,
    entry: &SongEntry,
) -> Result<(), EditorError> {
    let artist_id = entry
        .artist_id
        .clone()
        .unwrap_or_else(|| primary_artist_id.to_string());
    store.insert_song(&SongFields {
        title: entry.title.trim().to_string(),
        album_id: Some(album_id.to_string()),
        artist_id: Some(artist_id),
        bpm: entry.bpm,
        key: entry.key.clone(),
        duration_seconds: 0,
    })?;
    Ok(())
}

/// Deletes an album together with everything hanging off it. The store
/// does not cascade the album edge, so the songs and association rows go
/// first.
pub fn delete_album(store: &dyn LibraryStore, id: &str) -> Result<(), EditorError> {
    for song_id in store.album_song_ids(id)? {
        store.delete_song(&song_id)?;
    }
    store.delete_album_artists(id)?;
    store.delete_album_genres(id)?;
    store.delete_album(id)?;
    Ok(())
}
