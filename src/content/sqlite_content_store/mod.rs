mod albums;
mod interactions;
mod playlists;
mod songs;

use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::Result;
use rusqlite::{functions::FunctionFlags, Connection};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

/// V 0
const ALBUM_TABLE_V_0: Table = Table {
    name: "album",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("owner_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_album_owner_id", "owner_id")],
    unique_constraints: &[],
};

const SONG_TABLE_V_0: Table = Table {
    name: "song",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("file_url", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("duration_secs", &SqlType::Integer),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("owner_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            foreign_key = Some(&ForeignKey {
                foreign_table: "album",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::SetNull,
            })
        ),
        sqlite_column!(
            "play_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "likes_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "reposts_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_song_owner_id", "owner_id"),
        ("idx_song_album_id", "album_id"),
    ],
    unique_constraints: &[],
};

const PLAYLIST_TABLE_V_0: Table = Table {
    name: "playlist",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("owner_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "is_public",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_playlist_owner_id", "owner_id")],
    unique_constraints: &[],
};

const PLAYLIST_SONG_TABLE_V_0: Table = Table {
    name: "playlist_song",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "playlist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "song",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "position",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "added",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_playlist_song_position", "playlist_id, position")],
    unique_constraints: &[&["playlist_id", "song_id"]],
};

const INTERACTION_TABLE_V_0: Table = Table {
    name: "interaction",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            foreign_key = Some(&ForeignKey {
                foreign_table: "song",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "playlist_id",
            &SqlType::Integer,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("target_user_id", &SqlType::Integer),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_interaction_user_id", "user_id")],
    unique_constraints: &[
        &["user_id", "song_id", "kind"],
        &["user_id", "playlist_id", "kind"],
        &["user_id", "target_user_id", "kind"],
    ],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        ALBUM_TABLE_V_0,
        SONG_TABLE_V_0,
        PLAYLIST_TABLE_V_0,
        PLAYLIST_SONG_TABLE_V_0,
        INTERACTION_TABLE_V_0,
    ],
    migration: None,
}];

/// SQL function lowercasing text with full Unicode rules; SQLite's own
/// `lower()` and `LIKE` only fold ASCII letters.
const FOLD_CASE_FN: &str = "fold_case";

fn register_fold_case(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

/// Escapes LIKE wildcards so the term matches literally. The term is
/// lowercased to be compared against `fold_case(column)`.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn count_rows(conn: &Connection, table: &Table) -> Result<usize> {
    Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |row| {
        row.get(0)
    })?)
}

#[derive(Clone)]
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        register_fold_case(&conn)?;
        Ok(SqliteContentStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[cfg(test)]
mod test_fixtures {
    use super::SqliteContentStore;
    use crate::content::models::{AlbumFields, PlaylistFields, SongFields};
    use tempfile::TempDir;

    pub fn create_tmp_store() -> (SqliteContentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteContentStore::new(temp_dir.path().join("content.db")).unwrap();
        (store, temp_dir)
    }

    pub fn song_fields(title: &str) -> SongFields {
        SongFields {
            title: title.to_string(),
            description: None,
            file_url: format!("https://cdn.example.com/{}.mp3", title),
            image_url: None,
            duration_secs: Some(180),
            genre: None,
            album_id: None,
        }
    }

    pub fn album_fields(title: &str) -> AlbumFields {
        AlbumFields {
            title: title.to_string(),
            description: None,
            image_url: None,
        }
    }

    pub fn playlist_fields(title: &str, is_public: bool) -> PlaylistFields {
        PlaylistFields {
            title: title.to_string(),
            description: None,
            image_url: None,
            is_public,
        }
    }
}
