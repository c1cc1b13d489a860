use super::{
    content_store::ContentStore,
    error::{
        ContentError, ALBUM_NOT_FOUND, INTERACTION_NOT_FOUND, PLAYLIST_NOT_FOUND, SONG_NOT_FOUND,
        USER_NOT_FOUND,
    },
    models::{
        AddSongRequest, Album, AlbumInput, AlbumSummary, Interaction, InteractionKind,
        InteractionRequest, InteractionStats, InteractionTarget, Playlist, PlaylistDetail,
        PlaylistInput, PlaylistSong, PlaylistSummary, ReorderOutcome, ReorderRequest, Song,
        SongInput, ToggleOutcome, UserSongStats,
    },
};
use crate::user::UserStore;
use crate::validation::FieldErrors;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const MIN_SEARCH_TERM_LEN: usize = 2;

const FORBIDDEN_SONG: &str = "No tienes permisos para modificar esta canción";
const FORBIDDEN_ALBUM: &str = "No tienes permisos para modificar este álbum";
const FORBIDDEN_PLAYLIST: &str = "No tienes permisos para modificar esta playlist";
const FORBIDDEN_PRIVATE_PLAYLIST: &str = "No tienes permisos para ver esta playlist privada";
const FORBIDDEN_INTERACTION: &str = "No tienes permisos para eliminar esta interacción";

#[derive(Debug, Serialize)]
pub struct AlbumSongs {
    pub album: AlbumSummary,
    pub total_canciones: usize,
    pub canciones: Vec<Song>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistSongs {
    pub playlist: PlaylistSummary,
    pub total_canciones: usize,
    pub canciones: Vec<Song>,
}

/// The playlists of a user as seen by a given viewer.
#[derive(Debug)]
pub struct UserPlaylists {
    pub public: Vec<Playlist>,
    /// Empty unless the viewer is the owner.
    pub private: Vec<Playlist>,
}

/// Catalog operations with ownership, visibility and input validation on top
/// of a `ContentStore`.
pub struct ContentManager {
    store: Arc<dyn ContentStore>,
    user_store: Arc<dyn UserStore>,
}

impl ContentManager {
    pub fn new(store: Arc<dyn ContentStore>, user_store: Arc<dyn UserStore>) -> Self {
        Self { store, user_store }
    }

    fn require_existing_user(&self, user_id: usize) -> Result<()> {
        match self.user_store.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(ContentError::NotFound(USER_NOT_FOUND).into()),
        }
    }

    fn check_album_reference(&self, album_id: Option<usize>) -> Result<()> {
        if let Some(album_id) = album_id {
            if self.store.get_album(album_id)?.is_none() {
                let mut errors = FieldErrors::new();
                errors.add(
                    "album",
                    format!("Clave primaria \"{}\" inválida - objeto no existe.", album_id),
                );
                return Err(ContentError::Invalid(errors).into());
            }
        }
        Ok(())
    }

    // Songs

    pub fn list_songs(&self) -> Result<Vec<Song>> {
        self.store.list_songs()
    }

    pub fn get_song(&self, song_id: usize) -> Result<Song> {
        self.store
            .get_song(song_id)?
            .ok_or_else(|| ContentError::NotFound(SONG_NOT_FOUND).into())
    }

    pub fn create_song(&self, owner_id: usize, input: SongInput) -> Result<Song> {
        let fields = input.merge(None).map_err(ContentError::from)?;
        self.check_album_reference(fields.album_id)?;
        let song_id = self.store.create_song(owner_id, &fields)?;
        info!("User {} created song {}", owner_id, song_id);
        self.get_song(song_id)
    }

    /// Replaces (`partial == false`) or patches the song of `user_id`.
    pub fn update_song(
        &self,
        user_id: usize,
        song_id: usize,
        input: SongInput,
        partial: bool,
    ) -> Result<Song> {
        let song = self.get_song(song_id)?;
        if song.owner_id != user_id {
            return Err(ContentError::Forbidden(FORBIDDEN_SONG).into());
        }
        let base = partial.then(|| song.fields());
        let fields = input.merge(base).map_err(ContentError::from)?;
        self.check_album_reference(fields.album_id)?;
        if !self.store.update_song(song_id, &fields)? {
            return Err(ContentError::NotFound(SONG_NOT_FOUND).into());
        }
        self.get_song(song_id)
    }

    pub fn delete_song(&self, user_id: usize, song_id: usize) -> Result<()> {
        let song = self.get_song(song_id)?;
        if song.owner_id != user_id {
            return Err(ContentError::Forbidden(FORBIDDEN_SONG).into());
        }
        self.store.delete_song(song_id)?;
        info!("User {} deleted song {}", user_id, song_id);
        Ok(())
    }

    /// Returns the new play count.
    pub fn play_song(&self, song_id: usize) -> Result<u64> {
        self.store
            .increment_play_count(song_id)?
            .ok_or_else(|| ContentError::NotFound(SONG_NOT_FOUND).into())
    }

    /// Returns the trimmed term with its matches.
    pub fn search_songs(&self, query: Option<&str>) -> Result<(String, Vec<Song>)> {
        let term = query.map(str::trim).unwrap_or_default();
        if term.is_empty() {
            return Err(ContentError::BadRequest(
                "Parámetro de búsqueda \"q\" es requerido".to_string(),
            )
            .into());
        }
        if term.chars().count() < MIN_SEARCH_TERM_LEN {
            return Err(ContentError::BadRequest(format!(
                "El término de búsqueda debe tener al menos {} caracteres",
                MIN_SEARCH_TERM_LEN
            ))
            .into());
        }
        let songs = self.store.search_songs(term)?;
        debug!("Song search '{}' matched {}", term, songs.len());
        Ok((term.to_string(), songs))
    }

    pub fn user_songs(&self, user_id: usize) -> Result<(Vec<Song>, UserSongStats)> {
        self.require_existing_user(user_id)?;
        let songs = self.store.list_user_songs(user_id)?;
        let stats = self.store.user_song_stats(user_id)?;
        Ok((songs, stats))
    }

    // Albums

    pub fn list_albums(&self) -> Result<Vec<Album>> {
        self.store.list_albums()
    }

    pub fn get_album(&self, album_id: usize) -> Result<Album> {
        self.store
            .get_album(album_id)?
            .ok_or_else(|| ContentError::NotFound(ALBUM_NOT_FOUND).into())
    }

    pub fn create_album(&self, owner_id: usize, input: AlbumInput) -> Result<Album> {
        let fields = input.merge(None).map_err(ContentError::from)?;
        let album_id = self.store.create_album(owner_id, &fields)?;
        info!("User {} created album {}", owner_id, album_id);
        self.get_album(album_id)
    }

    pub fn update_album(
        &self,
        user_id: usize,
        album_id: usize,
        input: AlbumInput,
        partial: bool,
    ) -> Result<Album> {
        let album = self.get_album(album_id)?;
        if album.owner_id != user_id {
            return Err(ContentError::Forbidden(FORBIDDEN_ALBUM).into());
        }
        let fields = input
            .merge(partial.then(|| album.fields()))
            .map_err(ContentError::from)?;
        self.store.update_album(album_id, &fields)?;
        self.get_album(album_id)
    }

    pub fn delete_album(&self, user_id: usize, album_id: usize) -> Result<()> {
        let album = self.get_album(album_id)?;
        if album.owner_id != user_id {
            return Err(ContentError::Forbidden(FORBIDDEN_ALBUM).into());
        }
        self.store.delete_album(album_id)?;
        info!("User {} deleted album {}", user_id, album_id);
        Ok(())
    }

    pub fn album_songs(&self, album_id: usize) -> Result<AlbumSongs> {
        let album = self.get_album(album_id)?;
        let songs = self.store.list_album_songs(album_id)?;
        Ok(AlbumSongs {
            album: album.summary(),
            total_canciones: songs.len(),
            canciones: songs,
        })
    }

    // Playlists

    fn detail(&self, playlist: Playlist) -> Result<PlaylistDetail> {
        let songs = self.store.list_playlist_songs(playlist.id)?;
        Ok(PlaylistDetail {
            playlist,
            total_canciones: songs.len(),
            canciones: songs,
        })
    }

    fn owned_playlist(&self, user_id: usize, playlist_id: usize) -> Result<Playlist> {
        let playlist = self
            .store
            .get_playlist(playlist_id)?
            .ok_or(ContentError::NotFound(PLAYLIST_NOT_FOUND))?;
        if playlist.owner_id != user_id {
            return Err(ContentError::Forbidden(FORBIDDEN_PLAYLIST).into());
        }
        Ok(playlist)
    }

    pub fn list_playlists(&self, viewer: Option<usize>) -> Result<Vec<PlaylistDetail>> {
        self.store
            .list_visible_playlists(viewer)?
            .into_iter()
            .map(|playlist| self.detail(playlist))
            .collect()
    }

    /// Private playlists of other users are reported as missing.
    pub fn get_playlist(&self, viewer: Option<usize>, playlist_id: usize) -> Result<PlaylistDetail> {
        match self.store.get_playlist(playlist_id)? {
            Some(playlist) if playlist.is_visible_to(viewer) => self.detail(playlist),
            _ => Err(ContentError::NotFound(PLAYLIST_NOT_FOUND).into()),
        }
    }

    pub fn create_playlist(&self, owner_id: usize, input: PlaylistInput) -> Result<PlaylistDetail> {
        let fields = input.merge(None).map_err(ContentError::from)?;
        let playlist_id = self.store.create_playlist(owner_id, &fields)?;
        info!("User {} created playlist {}", owner_id, playlist_id);
        self.get_playlist(Some(owner_id), playlist_id)
    }

    pub fn update_playlist(
        &self,
        user_id: usize,
        playlist_id: usize,
        input: PlaylistInput,
        partial: bool,
    ) -> Result<PlaylistDetail> {
        let playlist = self.owned_playlist(user_id, playlist_id)?;
        let fields = input
            .merge(partial.then(|| playlist.fields()))
            .map_err(ContentError::from)?;
        self.store.update_playlist(playlist_id, &fields)?;
        self.get_playlist(Some(user_id), playlist_id)
    }

    pub fn delete_playlist(&self, user_id: usize, playlist_id: usize) -> Result<()> {
        self.owned_playlist(user_id, playlist_id)?;
        self.store.delete_playlist(playlist_id)?;
        info!("User {} deleted playlist {}", user_id, playlist_id);
        Ok(())
    }

    /// Unlike `get_playlist`, a private playlist of another user is forbidden
    /// rather than missing.
    pub fn playlist_songs(&self, viewer: Option<usize>, playlist_id: usize) -> Result<PlaylistSongs> {
        let playlist = self
            .store
            .get_playlist(playlist_id)?
            .ok_or(ContentError::NotFound(PLAYLIST_NOT_FOUND))?;
        if !playlist.is_visible_to(viewer) {
            return Err(ContentError::Forbidden(FORBIDDEN_PRIVATE_PLAYLIST).into());
        }
        let songs = self.store.list_playlist_songs(playlist_id)?;
        Ok(PlaylistSongs {
            playlist: playlist.summary(),
            total_canciones: songs.len(),
            canciones: songs,
        })
    }

    pub fn add_song_to_playlist(
        &self,
        user_id: usize,
        playlist_id: usize,
        request: AddSongRequest,
    ) -> Result<PlaylistSong> {
        self.owned_playlist(user_id, playlist_id)?;
        let Some(song_id) = request.cancion_id else {
            return Err(ContentError::BadRequest("cancion_id es requerido".to_string()).into());
        };
        let entry = self
            .store
            .add_playlist_song(playlist_id, song_id, request.orden)?;
        debug!(
            "Added song {} to playlist {} at {}",
            song_id, playlist_id, entry.position
        );
        Ok(entry)
    }

    pub fn remove_song_from_playlist(
        &self,
        user_id: usize,
        playlist_id: usize,
        song_id: usize,
    ) -> Result<()> {
        self.owned_playlist(user_id, playlist_id)?;
        if !self.store.remove_playlist_song(playlist_id, song_id)? {
            return Err(ContentError::NotFound("La canción no está en la playlist").into());
        }
        Ok(())
    }

    pub fn reorder_playlist(
        &self,
        user_id: usize,
        playlist_id: usize,
        request: ReorderRequest,
    ) -> Result<ReorderOutcome> {
        self.owned_playlist(user_id, playlist_id)?;
        if request.canciones_orden.is_empty() {
            return Err(ContentError::BadRequest("canciones_orden es requerido".to_string()).into());
        }
        let order = request
            .canciones_orden
            .iter()
            .map(|item| match (item.cancion_id, item.orden) {
                (Some(song_id), Some(position)) => Ok((song_id, position)),
                _ => Err(ContentError::BadRequest(
                    "cancion_id y orden son requeridos para cada item".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.store.reorder_playlist(playlist_id, &order)
    }

    pub fn playlist_entries(&self, viewer: Option<usize>) -> Result<Vec<PlaylistSong>> {
        self.store.list_playlist_entries(viewer)
    }

    pub fn user_playlists(&self, viewer: Option<usize>, owner_id: usize) -> Result<UserPlaylists> {
        self.require_existing_user(owner_id)?;
        let is_owner = viewer == Some(owner_id);
        let (public, private): (Vec<Playlist>, Vec<Playlist>) = self
            .store
            .list_user_playlists(owner_id, is_owner)?
            .into_iter()
            .partition(|p| p.is_public);
        Ok(UserPlaylists { public, private })
    }

    // Interactions

    /// Checks the field combination of a request and resolves its target.
    fn resolve_interaction(
        &self,
        user_id: usize,
        request: &InteractionRequest,
    ) -> Result<(InteractionKind, InteractionTarget)> {
        let kind = match request.tipo.as_deref() {
            None | Some("") => {
                let mut errors = FieldErrors::new();
                errors.add("tipo", "Este campo es requerido.");
                return Err(ContentError::Invalid(errors).into());
            }
            Some(tipo) => InteractionKind::parse(tipo).ok_or_else(|| {
                let mut errors = FieldErrors::new();
                errors.add("tipo", format!("\"{}\" no es una elección válida.", tipo));
                ContentError::Invalid(errors)
            })?,
        };

        let bad_request = |message: &str| -> anyhow::Error {
            ContentError::BadRequest(message.to_string()).into()
        };
        let target = match kind {
            InteractionKind::Like | InteractionKind::Repost => {
                match (request.cancion_id, request.playlist_id) {
                    (Some(song_id), None) => InteractionTarget::Song(song_id),
                    (None, Some(playlist_id)) => InteractionTarget::Playlist(playlist_id),
                    (None, None) => {
                        return Err(bad_request(
                            "Para like/repost debe proporcionar cancion_id o playlist_id",
                        ))
                    }
                    (Some(_), Some(_)) => {
                        return Err(bad_request(
                            "Para like/repost debe proporcionar solo cancion_id O playlist_id, no ambos",
                        ))
                    }
                }
            }
            InteractionKind::Follow => {
                let Some(target_user_id) = request.usuario_objetivo_id else {
                    return Err(bad_request(
                        "Para follow debe proporcionar usuario_objetivo_id",
                    ));
                };
                if request.cancion_id.is_some() || request.playlist_id.is_some() {
                    return Err(bad_request(
                        "Para follow no debe proporcionar cancion_id ni playlist_id",
                    ));
                }
                if target_user_id == user_id {
                    return Err(bad_request("No puedes seguirte a ti mismo"));
                }
                self.require_existing_user(target_user_id)?;
                InteractionTarget::User(target_user_id)
            }
        };
        Ok((kind, target))
    }

    pub fn create_interaction(
        &self,
        user_id: usize,
        request: InteractionRequest,
    ) -> Result<Interaction> {
        let (kind, target) = self.resolve_interaction(user_id, &request)?;
        let interaction = self.store.create_interaction(user_id, kind, target)?;
        info!("User {} added {} {:?}", user_id, kind.as_str(), target);
        Ok(interaction)
    }

    /// Returns the kind of the deleted interaction.
    pub fn delete_interaction(&self, user_id: usize, interaction_id: usize) -> Result<InteractionKind> {
        let interaction = self
            .store
            .get_interaction(interaction_id)?
            .ok_or(ContentError::NotFound(INTERACTION_NOT_FOUND))?;
        if interaction.user_id != user_id {
            return Err(ContentError::Forbidden(FORBIDDEN_INTERACTION).into());
        }
        if !self.store.delete_interaction(interaction_id)? {
            return Err(ContentError::NotFound(INTERACTION_NOT_FOUND).into());
        }
        info!("User {} removed interaction {}", user_id, interaction_id);
        Ok(interaction.kind)
    }

    pub fn toggle_interaction(
        &self,
        user_id: usize,
        request: InteractionRequest,
    ) -> Result<(InteractionKind, ToggleOutcome)> {
        let (kind, target) = self.resolve_interaction(user_id, &request)?;
        let outcome = self.store.toggle_interaction(user_id, kind, target)?;
        debug!(
            "User {} toggled {} {:?}: {}",
            user_id,
            kind.as_str(),
            target,
            matches!(outcome, ToggleOutcome::Created(_))
        );
        Ok((kind, outcome))
    }

    pub fn user_interactions(
        &self,
        user_id: usize,
        tipo: Option<&str>,
    ) -> Result<(Vec<Interaction>, InteractionStats)> {
        self.require_existing_user(user_id)?;
        let kind = match tipo.filter(|t| !t.is_empty()) {
            None => None,
            Some(tipo) => Some(InteractionKind::parse(tipo).ok_or_else(|| {
                ContentError::BadRequest(format!("Tipo de interacción inválido: {}", tipo))
            })?),
        };
        let interactions = self.store.list_user_interactions(user_id, kind)?;
        let stats = self.store.user_interaction_stats(user_id, kind)?;
        Ok((interactions, stats))
    }

    /// Returns (songs, albums, playlists) totals.
    pub fn content_counts(&self) -> Result<(usize, usize, usize)> {
        Ok((
            self.store.count_songs()?,
            self.store.count_albums()?,
            self.store.count_playlists()?,
        ))
    }
}
