use thiserror::Error;

use crate::validation::FieldErrors;

pub const SONG_NOT_FOUND: &str = "Canción no encontrada";
pub const ALBUM_NOT_FOUND: &str = "Álbum no encontrado";
pub const PLAYLIST_NOT_FOUND: &str = "Playlist no encontrada";
pub const USER_NOT_FOUND: &str = "Usuario no encontrado";
pub const INTERACTION_NOT_FOUND: &str = "Interacción no encontrada";

/// Catalog failures the HTTP layer maps to client errors.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Invalid(FieldErrors),
}

impl From<FieldErrors> for ContentError {
    fn from(errors: FieldErrors) -> Self {
        ContentError::Invalid(errors)
    }
}
