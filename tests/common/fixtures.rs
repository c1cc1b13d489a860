//! Test fixture creation for the user and content databases

use super::constants::*;
use anyhow::Result;
use soundclone_server::content::models::{AlbumFields, PlaylistFields, SongFields};
use soundclone_server::content::{AlbumStore, PlaylistStore, SongStore, SqliteContentStore};
use soundclone_server::user::{HashedPassword, SqliteUserStore, UserStore};
use std::path::Path;

/// Ids of everything the fixtures create
#[derive(Debug, Clone, Copy)]
pub struct TestIds {
    pub user_id: usize,
    pub other_user_id: usize,
    pub admin_id: usize,
    pub album_id: usize,
    pub rock_song_id: usize,
    pub jazz_song_id: usize,
    pub ballad_song_id: usize,
    pub public_playlist_id: usize,
    pub private_playlist_id: usize,
}

/// Creates a user with the given credentials, optionally promoting them to admin
pub fn create_user_with_password(
    store: &SqliteUserStore,
    username: &str,
    email: &str,
    password: &str,
    admin: bool,
) -> Result<usize> {
    let password = HashedPassword::new(password)?;
    let user_id = store.create_user(username, email, username, &password)?;
    if admin {
        store.set_user_admin(user_id, true)?;
    }
    Ok(user_id)
}

fn song(title: &str, genre: &str, album_id: Option<usize>) -> SongFields {
    SongFields {
        title: title.to_string(),
        description: Some(format!("{} description", title)),
        file_url: format!("https://cdn.example.com/{}.mp3", title.replace(' ', "-")),
        image_url: None,
        duration_secs: Some(200),
        genre: Some(genre.to_string()),
        album_id,
    }
}

fn playlist(title: &str, is_public: bool) -> PlaylistFields {
    PlaylistFields {
        title: title.to_string(),
        description: None,
        image_url: None,
        is_public,
    }
}

/// Creates user.db and content.db under `db_dir` with the seeded users and content
pub fn create_test_dbs(db_dir: &Path) -> Result<TestIds> {
    let user_store = SqliteUserStore::new(db_dir.join("user.db"))?;
    let user_id = create_user_with_password(&user_store, TEST_USER, TEST_EMAIL, TEST_PASS, false)?;
    let other_user_id =
        create_user_with_password(&user_store, OTHER_USER, OTHER_EMAIL, OTHER_PASS, false)?;
    let admin_id =
        create_user_with_password(&user_store, ADMIN_USER, ADMIN_EMAIL, ADMIN_PASS, true)?;

    let content_store = SqliteContentStore::new(db_dir.join("content.db"))?;
    let album_id = content_store.create_album(
        user_id,
        &AlbumFields {
            title: ALBUM_TITLE.to_string(),
            description: None,
            image_url: None,
        },
    )?;
    let rock_song_id =
        content_store.create_song(user_id, &song(ROCK_SONG_TITLE, "rock", Some(album_id)))?;
    let jazz_song_id = content_store.create_song(user_id, &song(JAZZ_SONG_TITLE, "jazz", None))?;
    let ballad_song_id =
        content_store.create_song(other_user_id, &song(BALLAD_SONG_TITLE, "pop", None))?;

    let public_playlist_id =
        content_store.create_playlist(user_id, &playlist(PUBLIC_PLAYLIST_TITLE, true))?;
    content_store.add_playlist_song(public_playlist_id, rock_song_id, None)?;
    content_store.add_playlist_song(public_playlist_id, jazz_song_id, None)?;
    let private_playlist_id =
        content_store.create_playlist(user_id, &playlist(PRIVATE_PLAYLIST_TITLE, false))?;
    content_store.add_playlist_song(private_playlist_id, ballad_song_id, None)?;

    Ok(TestIds {
        user_id,
        other_user_id,
        admin_id,
        album_id,
        rock_song_id,
        jazz_song_id,
        ballad_song_id,
        public_playlist_id,
        private_playlist_id,
    })
}
