use crate::content::models::{Playlist, Song};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate of every search for one lowercased term.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchIndexEntry {
    #[serde(rename = "termino_busqueda")]
    pub term: String,
    #[serde(rename = "resultados_canciones")]
    pub song_ids: Vec<usize>,
    #[serde(rename = "resultados_playlists")]
    pub playlist_ids: Vec<usize>,
    #[serde(rename = "frecuencia_busqueda")]
    pub frequency: u64,
    #[serde(rename = "ultima_actualizacion")]
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHistoryEntry {
    pub id: usize,
    #[serde(rename = "usuario_id")]
    pub user_id: usize,
    #[serde(rename = "termino_busqueda")]
    pub term: String,
    #[serde(rename = "resultados_encontrados")]
    pub results_found: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Cancion,
    Playlist,
    Usuario,
    Genero,
    Album,
}

impl SuggestionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionCategory::Cancion => "cancion",
            SuggestionCategory::Playlist => "playlist",
            SuggestionCategory::Usuario => "usuario",
            SuggestionCategory::Genero => "genero",
            SuggestionCategory::Album => "album",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cancion" => Some(SuggestionCategory::Cancion),
            "playlist" => Some(SuggestionCategory::Playlist),
            "usuario" => Some(SuggestionCategory::Usuario),
            "genero" => Some(SuggestionCategory::Genero),
            "album" => Some(SuggestionCategory::Album),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Suggestion {
    pub id: usize,
    #[serde(rename = "termino")]
    pub term: String,
    #[serde(rename = "categoria")]
    pub category: SuggestionCategory,
    #[serde(rename = "popularidad")]
    pub popularity: i64,
    #[serde(rename = "activo")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionRequest {
    pub termino: Option<String>,
    pub categoria: Option<String>,
    pub popularidad: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub canciones: Vec<Song>,
    pub playlists: Vec<Playlist>,
    pub total_resultados: usize,
}
