mod content_manager;
mod content_store;
pub mod error;
pub mod models;
mod sqlite_content_store;

pub use content_manager::{AlbumSongs, ContentManager, PlaylistSongs, UserPlaylists};
pub use content_store::{AlbumStore, ContentStore, InteractionStore, PlaylistStore, SongStore};
pub use error::ContentError;
pub use sqlite_content_store::SqliteContentStore;
