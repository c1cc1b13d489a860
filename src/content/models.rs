//! Catalog data models and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::validation::{normalize_optional, FieldErrors, MAX_GENRE_LEN, MAX_TITLE_LEN};

/// A field that can be absent (`None`), explicitly null (`Some(None)`) or set.
pub type Nullable<T> = Option<Option<T>>;

fn nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Takes the patch value when present, the base value otherwise.
fn pick<T>(patch: Nullable<T>, base: Option<T>) -> Option<T> {
    match patch {
        Some(value) => value,
        None => base,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Song {
    #[serde(rename = "cancion_id")]
    pub id: usize,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "archivo_url")]
    pub file_url: String,
    #[serde(rename = "imagen_url")]
    pub image_url: Option<String>,
    #[serde(rename = "duracion")]
    pub duration_secs: Option<u32>,
    #[serde(rename = "genero")]
    pub genre: Option<String>,
    #[serde(rename = "usuario_id")]
    pub owner_id: usize,
    #[serde(rename = "album")]
    pub album_id: Option<usize>,
    #[serde(rename = "album_titulo")]
    pub album_title: Option<String>,
    #[serde(rename = "reproducciones")]
    pub play_count: u64,
    pub likes_count: u64,
    pub reposts_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Song {
    pub fn fields(&self) -> SongFields {
        SongFields {
            title: self.title.clone(),
            description: self.description.clone(),
            file_url: self.file_url.clone(),
            image_url: self.image_url.clone(),
            duration_secs: self.duration_secs,
            genre: self.genre.clone(),
            album_id: self.album_id,
        }
    }
}

/// The owner-editable columns of a song.
#[derive(Debug, Clone, PartialEq)]
pub struct SongFields {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub image_url: Option<String>,
    pub duration_secs: Option<u32>,
    pub genre: Option<String>,
    pub album_id: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongInput {
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "nullable")]
    pub description: Nullable<String>,
    #[serde(rename = "archivo_url")]
    pub file_url: Option<String>,
    #[serde(rename = "imagen_url", default, deserialize_with = "nullable")]
    pub image_url: Nullable<String>,
    #[serde(rename = "duracion", default, deserialize_with = "nullable")]
    pub duration_secs: Nullable<u32>,
    #[serde(rename = "genero", default, deserialize_with = "nullable")]
    pub genre: Nullable<String>,
    #[serde(rename = "album", default, deserialize_with = "nullable")]
    pub album_id: Nullable<usize>,
}

impl SongInput {
    /// Merges the input over `base` and validates the result. Without a base
    /// (create or full replace) the required fields must be present.
    pub fn merge(self, base: Option<SongFields>) -> Result<SongFields, FieldErrors> {
        let base_title = base.as_ref().map(|b| b.title.clone());
        let base_file_url = base.as_ref().map(|b| b.file_url.clone());
        let title = self.title.or(base_title);
        let file_url = self.file_url.or(base_file_url);

        let mut errors = FieldErrors::new();
        errors.require_text("titulo", title.as_deref(), MAX_TITLE_LEN);
        errors.require_url("archivo_url", file_url.as_deref());

        let (description, image_url, duration_secs, genre, album_id) = match base {
            Some(b) => (b.description, b.image_url, b.duration_secs, b.genre, b.album_id),
            None => (None, None, None, None, None),
        };
        let description = pick(self.description, description);
        let image_url = normalize_optional(pick(self.image_url, image_url));
        let duration_secs = pick(self.duration_secs, duration_secs);
        let genre = normalize_optional(pick(self.genre, genre));
        let album_id = pick(self.album_id, album_id);
        errors.optional_url("imagen_url", image_url.as_deref());
        if let Some(genre) = genre.as_deref() {
            errors.check_max_len("genero", genre, MAX_GENRE_LEN);
        }
        errors.into_result()?;

        Ok(SongFields {
            title: title.unwrap_or_default().trim().to_string(),
            description: normalize_optional(description),
            file_url: file_url.unwrap_or_default().trim().to_string(),
            image_url,
            duration_secs,
            genre,
            album_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Album {
    #[serde(rename = "album_id")]
    pub id: usize,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "imagen_url")]
    pub image_url: Option<String>,
    #[serde(rename = "usuario_id")]
    pub owner_id: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Album {
    pub fn fields(&self) -> AlbumFields {
        AlbumFields {
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
        }
    }

    pub fn summary(&self) -> AlbumSummary {
        AlbumSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlbumFields {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumInput {
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "nullable")]
    pub description: Nullable<String>,
    #[serde(rename = "imagen_url", default, deserialize_with = "nullable")]
    pub image_url: Nullable<String>,
}

impl AlbumInput {
    pub fn merge(self, base: Option<AlbumFields>) -> Result<AlbumFields, FieldErrors> {
        let (base_title, base_description, base_image_url) = match base {
            Some(b) => (Some(b.title), b.description, b.image_url),
            None => (None, None, None),
        };
        let title = self.title.or(base_title);
        let image_url = normalize_optional(pick(self.image_url, base_image_url));

        let mut errors = FieldErrors::new();
        errors.require_text("titulo", title.as_deref(), MAX_TITLE_LEN);
        errors.optional_url("imagen_url", image_url.as_deref());
        errors.into_result()?;

        Ok(AlbumFields {
            title: title.unwrap_or_default().trim().to_string(),
            description: normalize_optional(pick(self.description, base_description)),
            image_url,
        })
    }
}

/// Album header embedded in `albums/{id}/canciones`.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumSummary {
    pub id: usize,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "imagen_url")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Playlist {
    #[serde(rename = "playlist_id")]
    pub id: usize,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "imagen_url")]
    pub image_url: Option<String>,
    #[serde(rename = "usuario_id")]
    pub owner_id: usize,
    #[serde(rename = "es_publica")]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    pub fn fields(&self) -> PlaylistFields {
        PlaylistFields {
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            is_public: self.is_public,
        }
    }

    pub fn is_visible_to(&self, viewer: Option<usize>) -> bool {
        self.is_public || viewer == Some(self.owner_id)
    }

    pub fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            is_public: self.is_public,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistFields {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistInput {
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "nullable")]
    pub description: Nullable<String>,
    #[serde(rename = "imagen_url", default, deserialize_with = "nullable")]
    pub image_url: Nullable<String>,
    #[serde(rename = "es_publica")]
    pub is_public: Option<bool>,
}

impl PlaylistInput {
    pub fn merge(self, base: Option<PlaylistFields>) -> Result<PlaylistFields, FieldErrors> {
        let (base_title, base_description, base_image_url, base_public) = match base {
            Some(b) => (Some(b.title), b.description, b.image_url, b.is_public),
            None => (None, None, None, true),
        };
        let title = self.title.or(base_title);
        let image_url = normalize_optional(pick(self.image_url, base_image_url));

        let mut errors = FieldErrors::new();
        errors.require_text("titulo", title.as_deref(), MAX_TITLE_LEN);
        errors.optional_url("imagen_url", image_url.as_deref());
        errors.into_result()?;

        Ok(PlaylistFields {
            title: title.unwrap_or_default().trim().to_string(),
            description: normalize_optional(pick(self.description, base_description)),
            image_url,
            is_public: self.is_public.unwrap_or(base_public),
        })
    }
}

/// A playlist with its ordered songs.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub total_canciones: usize,
    pub canciones: Vec<Song>,
}

/// Playlist header embedded in `playlists/{id}/canciones`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistSummary {
    pub id: usize,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "imagen_url")]
    pub image_url: Option<String>,
    #[serde(rename = "es_publica")]
    pub is_public: bool,
}

/// One membership row of a playlist.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaylistSong {
    pub id: usize,
    #[serde(rename = "playlist")]
    pub playlist_id: usize,
    #[serde(rename = "cancion")]
    pub song_id: usize,
    #[serde(rename = "orden")]
    pub position: i64,
    pub added_at: DateTime<Utc>,
    #[serde(rename = "cancion_titulo")]
    pub song_title: String,
    #[serde(rename = "playlist_titulo")]
    pub playlist_title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSongRequest {
    pub cancion_id: Option<usize>,
    pub orden: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderItem {
    pub cancion_id: Option<usize>,
    pub orden: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub canciones_orden: Vec<ReorderItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReorderOutcome {
    pub updated: usize,
    pub missing_song_ids: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Repost,
    Follow,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Repost => "repost",
            InteractionKind::Follow => "follow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(InteractionKind::Like),
            "repost" => Some(InteractionKind::Repost),
            "follow" => Some(InteractionKind::Follow),
            _ => None,
        }
    }

    /// Name used at the start of user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            InteractionKind::Like => "Like",
            InteractionKind::Repost => "Repost",
            InteractionKind::Follow => "Follow",
        }
    }

    /// The song counter this kind keeps in sync, if any.
    pub fn song_counter_column(&self) -> Option<&'static str> {
        match self {
            InteractionKind::Like => Some("likes_count"),
            InteractionKind::Repost => Some("reposts_count"),
            InteractionKind::Follow => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionTarget {
    Song(usize),
    Playlist(usize),
    User(usize),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Interaction {
    pub id: usize,
    #[serde(rename = "usuario_id")]
    pub user_id: usize,
    #[serde(rename = "cancion")]
    pub song_id: Option<usize>,
    #[serde(rename = "playlist")]
    pub playlist_id: Option<usize>,
    #[serde(rename = "usuario_objetivo_id")]
    pub target_user_id: Option<usize>,
    #[serde(rename = "tipo")]
    pub kind: InteractionKind,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "cancion_titulo")]
    pub song_title: Option<String>,
    #[serde(rename = "playlist_titulo")]
    pub playlist_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionRequest {
    pub tipo: Option<String>,
    pub cancion_id: Option<usize>,
    pub playlist_id: Option<usize>,
    pub usuario_objetivo_id: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Created(Interaction),
    Removed,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserSongStats {
    pub total_reproducciones: u64,
    pub total_likes: u64,
    pub total_reposts: u64,
    pub generos_musicales: Vec<String>,
    pub total_albums: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InteractionStats {
    pub total_likes: usize,
    pub total_reposts: usize,
    pub total_follows: usize,
}
