use super::{count_rows, like_pattern, SqliteContentStore, SONG_TABLE_V_0};
use crate::content::content_store::SongStore;
use crate::content::models::{Song, SongFields, UserSongStats};
use crate::sqlite_persistence::{datetime_from_secs, now_secs};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) const SONG_SELECT: &str = "SELECT s.id, s.title, s.description, s.file_url, \
    s.image_url, s.duration_secs, s.genre, s.owner_id, s.album_id, a.title, s.play_count, \
    s.likes_count, s.reposts_count, s.created, s.updated \
    FROM song s LEFT JOIN album a ON a.id = s.album_id";

const NEWEST_FIRST: &str = "ORDER BY s.created DESC, s.id DESC";

pub(super) fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        file_url: row.get(3)?,
        image_url: row.get(4)?,
        duration_secs: row.get(5)?,
        genre: row.get(6)?,
        owner_id: row.get(7)?,
        album_id: row.get(8)?,
        album_title: row.get(9)?,
        play_count: row.get::<_, i64>(10)? as u64,
        likes_count: row.get::<_, i64>(11)? as u64,
        reposts_count: row.get::<_, i64>(12)? as u64,
        created_at: datetime_from_secs(row.get(13)?),
        updated_at: datetime_from_secs(row.get(14)?),
    })
}

pub(super) fn query_songs<P: rusqlite::Params>(
    conn: &Connection,
    sql_tail: &str,
    params: P,
) -> Result<Vec<Song>> {
    let mut stmt = conn.prepare(&format!("{} {}", SONG_SELECT, sql_tail))?;
    let songs = stmt
        .query_map(params, song_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(songs)
}

impl SongStore for SqliteContentStore {
    fn create_song(&self, owner_id: usize, fields: &SongFields) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (title, description, file_url, image_url, duration_secs, genre, owner_id, album_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                SONG_TABLE_V_0.name
            ),
            params![
                fields.title,
                fields.description,
                fields.file_url,
                fields.image_url,
                fields.duration_secs,
                fields.genre,
                owner_id,
                fields.album_id,
            ],
        )
        .with_context(|| format!("Failed to create song {}", fields.title))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_song(&self, song_id: usize) -> Result<Option<Song>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE s.id = ?1", SONG_SELECT),
            params![song_id],
            song_from_row,
        )
        .optional()
        .context("Failed to query song")
    }

    fn list_songs(&self) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        query_songs(&conn, NEWEST_FIRST, [])
    }

    fn list_user_songs(&self, owner_id: usize) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        query_songs(
            &conn,
            &format!("WHERE s.owner_id = ?1 {}", NEWEST_FIRST),
            params![owner_id],
        )
    }

    fn list_album_songs(&self, album_id: usize) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        query_songs(
            &conn,
            "WHERE s.album_id = ?1 ORDER BY s.created ASC, s.id ASC",
            params![album_id],
        )
    }

    fn update_song(&self, song_id: usize, fields: &SongFields) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET title = ?1, description = ?2, file_url = ?3, image_url = ?4,
                    duration_secs = ?5, genre = ?6, album_id = ?7, updated = ?8 WHERE id = ?9",
                    SONG_TABLE_V_0.name
                ),
                params![
                    fields.title,
                    fields.description,
                    fields.file_url,
                    fields.image_url,
                    fields.duration_secs,
                    fields.genre,
                    fields.album_id,
                    now_secs(),
                    song_id,
                ],
            )
            .with_context(|| format!("Failed to update song {}", song_id))?;
        Ok(updated > 0)
    }

    fn delete_song(&self, song_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", SONG_TABLE_V_0.name),
            params![song_id],
        )?;
        Ok(deleted > 0)
    }

    fn increment_play_count(&self, song_id: usize) -> Result<Option<u64>> {
        let conn = self.conn.lock().unwrap();
        let plays = conn
            .query_row(
                &format!(
                    "UPDATE {} SET play_count = play_count + 1 WHERE id = ?1 RETURNING play_count",
                    SONG_TABLE_V_0.name
                ),
                params![song_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(plays.map(|p| p as u64))
    }

    fn search_songs(&self, term: &str) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        query_songs(
            &conn,
            "WHERE fold_case(s.title) LIKE ?1 ESCAPE '\\' \
            OR fold_case(s.description) LIKE ?1 ESCAPE '\\' \
            OR fold_case(s.genre) LIKE ?1 ESCAPE '\\' \
            ORDER BY s.play_count DESC, s.created DESC, s.id DESC",
            params![like_pattern(term)],
        )
    }

    fn search_song_titles(&self, term: &str, limit: usize) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        query_songs(
            &conn,
            &format!("WHERE fold_case(s.title) LIKE ?1 ESCAPE '\\' {} LIMIT ?2", NEWEST_FIRST),
            params![like_pattern(term), limit],
        )
    }

    fn user_song_stats(&self, owner_id: usize) -> Result<UserSongStats> {
        let conn = self.conn.lock().unwrap();
        let (plays, likes, reposts, albums) = conn.query_row(
            &format!(
                "SELECT COALESCE(SUM(play_count), 0), COALESCE(SUM(likes_count), 0),
                COALESCE(SUM(reposts_count), 0), COUNT(DISTINCT album_id)
                FROM {} WHERE owner_id = ?1",
                SONG_TABLE_V_0.name
            ),
            params![owner_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, usize>(3)?,
                ))
            },
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT genre FROM {} WHERE owner_id = ?1 AND genre IS NOT NULL ORDER BY genre",
            SONG_TABLE_V_0.name
        ))?;
        let genres = stmt
            .query_map(params![owner_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UserSongStats {
            total_reproducciones: plays as u64,
            total_likes: likes as u64,
            total_reposts: reposts as u64,
            generos_musicales: genres,
            total_albums: albums,
        })
    }

    fn count_songs(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        count_rows(&conn, &SONG_TABLE_V_0)
    }
}
