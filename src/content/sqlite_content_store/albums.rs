use super::{count_rows, SqliteContentStore, ALBUM_TABLE_V_0};
use crate::content::content_store::AlbumStore;
use crate::content::models::{Album, AlbumFields};
use crate::sqlite_persistence::{datetime_from_secs, now_secs};
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

const ALBUM_COLUMNS: &str = "id, title, description, image_url, owner_id, created, updated";

fn album_from_row(row: &Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: datetime_from_secs(row.get(5)?),
        updated_at: datetime_from_secs(row.get(6)?),
    })
}

impl AlbumStore for SqliteContentStore {
    fn create_album(&self, owner_id: usize, fields: &AlbumFields) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (title, description, image_url, owner_id) VALUES (?1, ?2, ?3, ?4)",
                ALBUM_TABLE_V_0.name
            ),
            params![fields.title, fields.description, fields.image_url, owner_id],
        )
        .with_context(|| format!("Failed to create album {}", fields.title))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_album(&self, album_id: usize) -> Result<Option<Album>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                ALBUM_COLUMNS, ALBUM_TABLE_V_0.name
            ),
            params![album_id],
            album_from_row,
        )
        .optional()
        .context("Failed to query album")
    }

    fn list_albums(&self) -> Result<Vec<Album>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY created DESC, id DESC",
            ALBUM_COLUMNS, ALBUM_TABLE_V_0.name
        ))?;
        let albums = stmt
            .query_map([], album_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    fn update_album(&self, album_id: usize, fields: &AlbumFields) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET title = ?1, description = ?2, image_url = ?3, updated = ?4 WHERE id = ?5",
                ALBUM_TABLE_V_0.name
            ),
            params![
                fields.title,
                fields.description,
                fields.image_url,
                now_secs(),
                album_id
            ],
        )?;
        Ok(updated > 0)
    }

    fn delete_album(&self, album_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", ALBUM_TABLE_V_0.name),
            params![album_id],
        )?;
        Ok(deleted > 0)
    }

    fn count_albums(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        count_rows(&conn, &ALBUM_TABLE_V_0)
    }
}
