mod models;
mod schema;
mod store;
mod trait_def;
mod validation;

pub use models::{
    Album, AlbumArtist, AlbumArtistDetail, AlbumFields, AlbumWithArtist, Artist, Genre,
    ResolvedAlbum, ResolvedSong, Song, SongFields,
};
pub use store::SqliteLibraryStore;
pub use trait_def::LibraryStore;
pub use validation::FieldError;
