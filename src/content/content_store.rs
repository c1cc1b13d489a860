use super::models::{
    Album, AlbumFields, Interaction, InteractionKind, InteractionStats, InteractionTarget,
    Playlist, PlaylistFields, PlaylistSong, ReorderOutcome, Song, SongFields, ToggleOutcome,
    UserSongStats,
};
use anyhow::Result;

pub trait SongStore: Send + Sync {
    /// Creates a song owned by `owner_id` and returns its id.
    /// Fails if `fields.album_id` references a missing album.
    fn create_song(&self, owner_id: usize, fields: &SongFields) -> Result<usize>;

    /// Returns Ok(None) if the song does not exist.
    fn get_song(&self, song_id: usize) -> Result<Option<Song>>;

    /// Returns all songs, newest first.
    fn list_songs(&self) -> Result<Vec<Song>>;

    /// Returns the songs of a user, newest first.
    fn list_user_songs(&self, owner_id: usize) -> Result<Vec<Song>>;

    /// Returns the songs of an album, oldest first.
    fn list_album_songs(&self, album_id: usize) -> Result<Vec<Song>>;

    /// Overwrites the editable columns of a song.
    /// Returns Ok(false) if the song does not exist.
    fn update_song(&self, song_id: usize, fields: &SongFields) -> Result<bool>;

    /// Returns Ok(false) if the song does not exist.
    fn delete_song(&self, song_id: usize) -> Result<bool>;

    /// Increments the play counter and returns its new value.
    /// Returns Ok(None) if the song does not exist.
    fn increment_play_count(&self, song_id: usize) -> Result<Option<u64>>;

    /// Case-insensitive substring match on title, description and genre,
    /// most played first, then newest.
    fn search_songs(&self, term: &str) -> Result<Vec<Song>>;

    /// Case-insensitive substring match on title only, newest first.
    fn search_song_titles(&self, term: &str, limit: usize) -> Result<Vec<Song>>;

    /// Aggregates over all songs of a user.
    fn user_song_stats(&self, owner_id: usize) -> Result<UserSongStats>;

    fn count_songs(&self) -> Result<usize>;
}

pub trait AlbumStore: Send + Sync {
    fn create_album(&self, owner_id: usize, fields: &AlbumFields) -> Result<usize>;

    /// Returns Ok(None) if the album does not exist.
    fn get_album(&self, album_id: usize) -> Result<Option<Album>>;

    /// Returns all albums, newest first.
    fn list_albums(&self) -> Result<Vec<Album>>;

    /// Returns Ok(false) if the album does not exist.
    fn update_album(&self, album_id: usize, fields: &AlbumFields) -> Result<bool>;

    /// Deletes an album, detaching its songs.
    /// Returns Ok(false) if the album does not exist.
    fn delete_album(&self, album_id: usize) -> Result<bool>;

    fn count_albums(&self) -> Result<usize>;
}

pub trait PlaylistStore: Send + Sync {
    fn create_playlist(&self, owner_id: usize, fields: &PlaylistFields) -> Result<usize>;

    /// Returns Ok(None) if the playlist does not exist.
    fn get_playlist(&self, playlist_id: usize) -> Result<Option<Playlist>>;

    /// Returns public playlists plus the private ones of `viewer`, newest first.
    fn list_visible_playlists(&self, viewer: Option<usize>) -> Result<Vec<Playlist>>;

    /// Returns the playlists of a user, newest first.
    fn list_user_playlists(&self, owner_id: usize, include_private: bool)
        -> Result<Vec<Playlist>>;

    /// Returns Ok(false) if the playlist does not exist.
    fn update_playlist(&self, playlist_id: usize, fields: &PlaylistFields) -> Result<bool>;

    /// Returns Ok(false) if the playlist does not exist.
    fn delete_playlist(&self, playlist_id: usize) -> Result<bool>;

    /// Returns the songs of a playlist in playlist order.
    fn list_playlist_songs(&self, playlist_id: usize) -> Result<Vec<Song>>;

    /// Inserts a song at `position` (appending when None) and re-sequences the
    /// playlist. Fails with `ContentError` if either side is missing or the
    /// song is already in the playlist.
    fn add_playlist_song(
        &self,
        playlist_id: usize,
        song_id: usize,
        position: Option<i64>,
    ) -> Result<PlaylistSong>;

    /// Removes a song and re-sequences the playlist.
    /// Returns Ok(false) if the song was not in the playlist.
    fn remove_playlist_song(&self, playlist_id: usize, song_id: usize) -> Result<bool>;

    /// Applies the requested positions and re-sequences the playlist.
    fn reorder_playlist(&self, playlist_id: usize, order: &[(usize, i64)])
        -> Result<ReorderOutcome>;

    /// Returns the membership rows of every playlist visible to `viewer`, newest first.
    fn list_playlist_entries(&self, viewer: Option<usize>) -> Result<Vec<PlaylistSong>>;

    /// Case-insensitive substring match on public playlist titles, newest first.
    fn search_public_playlist_titles(&self, term: &str, limit: usize) -> Result<Vec<Playlist>>;

    fn count_playlists(&self) -> Result<usize>;
}

pub trait InteractionStore: Send + Sync {
    /// Deletes the (user, kind, target) row if present, creates it otherwise,
    /// keeping the song counters in step within the same transaction.
    /// Fails with `ContentError::NotFound` if a song or playlist target is missing.
    fn toggle_interaction(
        &self,
        user_id: usize,
        kind: InteractionKind,
        target: InteractionTarget,
    ) -> Result<ToggleOutcome>;

    /// Creates the row, failing with `ContentError::BadRequest` if it already exists.
    fn create_interaction(
        &self,
        user_id: usize,
        kind: InteractionKind,
        target: InteractionTarget,
    ) -> Result<Interaction>;

    /// Returns Ok(None) if the interaction does not exist.
    fn get_interaction(&self, interaction_id: usize) -> Result<Option<Interaction>>;

    /// Deletes the row and decrements the matching song counter.
    /// Returns Ok(false) if the interaction does not exist.
    fn delete_interaction(&self, interaction_id: usize) -> Result<bool>;

    /// Returns the interactions of a user, newest first.
    fn list_user_interactions(
        &self,
        user_id: usize,
        kind: Option<InteractionKind>,
    ) -> Result<Vec<Interaction>>;

    /// Counts the interactions of a user by kind.
    fn user_interaction_stats(
        &self,
        user_id: usize,
        kind: Option<InteractionKind>,
    ) -> Result<InteractionStats>;
}

pub trait ContentStore: SongStore + AlbumStore + PlaylistStore + InteractionStore {}

impl<T: SongStore + AlbumStore + PlaylistStore + InteractionStore> ContentStore for T {}
