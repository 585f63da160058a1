//! The track save procedure: the single-entity sibling of the album save.

use super::{DraftError, EditorError};
use crate::library_store::{LibraryStore, SongFields};
use serde::{Deserialize, Serialize};

/// The full desired state of a song as edited in the track form.
/// `artist_id` is the denormalized reference kept on the row itself;
/// `artist_ids` / `genre_ids` are the full collaboration and tagging sets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SongDraft {
    pub title: String,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    pub bpm: Option<u16>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub artist_ids: Vec<String>,
    #[serde(default)]
    pub genre_ids: Vec<String>,
}

fn validate_song_draft(draft: &SongDraft) -> Result<(), DraftError> {
    if draft.title.trim().is_empty() {
        return Err(DraftError::EmptyTitle);
    }
    if draft.bpm.is_none() {
        return Err(DraftError::MissingBpm);
    }
    Ok(())
}

/// Persists a song draft. With `existing_id` set the scalar fields are
/// updated and both association sets replaced wholesale; otherwise the
/// song is inserted and the association rows reference the generated
/// identifier. First failing store call aborts the rest, nothing is
/// rolled back.
pub fn save_song(
    store: &dyn LibraryStore,
    existing_id: Option<&str>,
    draft: &SongDraft,
) -> Result<String, EditorError> {
    validate_song_draft(draft)?;

    let fields = SongFields {
        title: draft.title.trim().to_string(),
        album_id: draft.album_id.clone(),
        artist_id: draft.artist_id.clone(),
        bpm: draft.bpm,
        key: draft.key.clone(),
        duration_seconds: draft.duration_seconds.unwrap_or(0),
    };

    let song_id = match existing_id {
        Some(id) => {
            store.update_song(id, &fields)?;
            id.to_string()
        }
        None => store.insert_song(&fields)?.id,
    };

    if existing_id.is_some() {
        store.delete_song_artists(&song_id)?;
    }
    for artist_id in &draft.artist_ids {
        store.insert_song_artist(&song_id, artist_id)?;
    }

    if existing_id.is_some() {
        store.delete_song_genres(&song_id)?;
    }
    for genre_id in &draft.genre_ids {
        store.insert_song_genre(&song_id, genre_id)?;
    }

    Ok(song_id)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{Call, RecordingStore};
    use super::*;

    fn draft(title: &str, bpm: Option<u16>) -> SongDraft {
        SongDraft {
            title: title.to_string(),
            album_id: Some("album-1".to_string()),
            artist_id: Some("nova".to_string()),
            bpm,
            key: None,
            duration_seconds: None,
            artist_ids: vec!["nova".to_string(), "guest".to_string()],
            genre_ids: vec!["genre-house".to_string()],
        }
    }

    #[test]
    fn rejects_missing_bpm_before_any_store_call() {
        let store = RecordingStore::default();
        let err = save_song(&store, None, &draft("Horizon", None)).unwrap_err();
        assert!(matches!(err, EditorError::Invalid(DraftError::MissingBpm)));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn rejects_blank_title_before_any_store_call() {
        let store = RecordingStore::default();
        let err = save_song(&store, None, &draft("  ", Some(128))).unwrap_err();
        assert!(matches!(err, EditorError::Invalid(DraftError::EmptyTitle)));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn update_replaces_both_association_sets() {
        let store = RecordingStore::default();

        save_song(&store, Some("song-1"), &draft("Horizon", Some(128))).unwrap();

        assert_eq!(
            store.calls(),
            vec![
                Call::UpdateSong {
                    id: "song-1".to_string()
                },
                Call::DeleteSongArtists {
                    song_id: "song-1".to_string()
                },
                Call::InsertSongArtist {
                    song_id: "song-1".to_string(),
                    artist_id: "nova".to_string()
                },
                Call::InsertSongArtist {
                    song_id: "song-1".to_string(),
                    artist_id: "guest".to_string()
                },
                Call::DeleteSongGenres {
                    song_id: "song-1".to_string()
                },
                Call::InsertSongGenre {
                    song_id: "song-1".to_string(),
                    genre_id: "genre-house".to_string()
                },
            ]
        );
    }

    #[test]
    fn create_inserts_then_references_the_generated_id() {
        let store = RecordingStore::default();

        let song_id = save_song(&store, None, &draft("Horizon", Some(128))).unwrap();

        let calls = store.calls();
        assert!(matches!(calls[0], Call::InsertSong { .. }));
        // no deletes in create mode, associations target the new id
        assert!(!calls
            .iter()
            .any(|c| matches!(c, Call::DeleteSongArtists { .. } | Call::DeleteSongGenres { .. })));
        assert!(calls.iter().any(|c| matches!(
            c,
            Call::InsertSongArtist { song_id: id, .. } if *id == song_id
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            Call::InsertSongGenre { song_id: id, .. } if *id == song_id
        )));
    }

    #[test]
    fn failure_on_artist_delete_stops_genre_writes() {
        let store = RecordingStore::default();
        store.fail_on(Call::DeleteSongArtists {
            song_id: "song-1".to_string(),
        });

        let err = save_song(&store, Some("song-1"), &draft("Horizon", Some(128))).unwrap_err();
        assert!(matches!(err, EditorError::Store(_)));

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[1], Call::DeleteSongArtists { .. }));
    }
}
