//! Field validation for library entities, applied before rows are written.

use super::models::{AlbumFields, SongFields};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("Field '{0}' is required but was empty")]
    Empty(&'static str),

    #[error("Field 'release_year' must be a four digit year, got {0}")]
    InvalidReleaseYear(u16),
}

pub fn validate_album_fields(fields: &AlbumFields) -> Result<(), FieldError> {
    if fields.title.trim().is_empty() {
        return Err(FieldError::Empty("title"));
    }
    if fields.artist_id.trim().is_empty() {
        return Err(FieldError::Empty("artist_id"));
    }
    if let Some(year) = fields.release_year {
        if !(1000..=9999).contains(&year) {
            return Err(FieldError::InvalidReleaseYear(year));
        }
    }
    Ok(())
}

pub fn validate_song_fields(fields: &SongFields) -> Result<(), FieldError> {
    if fields.title.trim().is_empty() {
        return Err(FieldError::Empty("title"));
    }
    Ok(())
}

pub fn validate_genre_name(name: &str) -> Result<(), FieldError> {
    if name.trim().is_empty() {
        return Err(FieldError::Empty("name"));
    }
    Ok(())
}
