use super::songs::query_songs;
use super::{
    count_rows, like_pattern, SqliteContentStore, PLAYLIST_SONG_TABLE_V_0, PLAYLIST_TABLE_V_0,
};
use crate::content::content_store::PlaylistStore;
use crate::content::error::{ContentError, PLAYLIST_NOT_FOUND, SONG_NOT_FOUND};
use crate::content::models::{Playlist, PlaylistFields, PlaylistSong, ReorderOutcome, Song};
use crate::sqlite_persistence::{datetime_from_secs, now_secs};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

pub const SONG_ALREADY_IN_PLAYLIST: &str = "La canción ya está en la playlist";

const PLAYLIST_COLUMNS: &str =
    "id, title, description, image_url, owner_id, is_public, created, updated";

const ENTRY_SELECT: &str = "SELECT ps.id, ps.playlist_id, ps.song_id, ps.position, ps.added, \
    s.title, p.title FROM playlist_song ps \
    JOIN song s ON s.id = ps.song_id \
    JOIN playlist p ON p.id = ps.playlist_id";

fn playlist_from_row(row: &Row) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        owner_id: row.get(4)?,
        is_public: row.get(5)?,
        created_at: datetime_from_secs(row.get(6)?),
        updated_at: datetime_from_secs(row.get(7)?),
    })
}

fn entry_from_row(row: &Row) -> rusqlite::Result<PlaylistSong> {
    Ok(PlaylistSong {
        id: row.get(0)?,
        playlist_id: row.get(1)?,
        song_id: row.get(2)?,
        position: row.get(3)?,
        added_at: datetime_from_secs(row.get(4)?),
        song_title: row.get(5)?,
        playlist_title: row.get(6)?,
    })
}

fn query_playlists<P: rusqlite::Params>(
    conn: &Connection,
    sql_tail: &str,
    params: P,
) -> Result<Vec<Playlist>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} {}",
        PLAYLIST_COLUMNS, PLAYLIST_TABLE_V_0.name, sql_tail
    ))?;
    let playlists = stmt
        .query_map(params, playlist_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(playlists)
}

fn row_exists(conn: &Connection, table: &str, id: usize) -> Result<bool> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", table),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Returns (entry id, song id) pairs in playlist order.
fn ordered_entries(conn: &Connection, playlist_id: usize) -> Result<Vec<(usize, usize)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, song_id FROM {} WHERE playlist_id = ?1 ORDER BY position, added, id",
        PLAYLIST_SONG_TABLE_V_0.name
    ))?;
    let entries = stmt
        .query_map(params![playlist_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn write_positions(conn: &Connection, entry_ids: &[usize]) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE {} SET position = ?1 WHERE id = ?2",
        PLAYLIST_SONG_TABLE_V_0.name
    ))?;
    for (position, entry_id) in entry_ids.iter().enumerate() {
        stmt.execute(params![position as i64, entry_id])?;
    }
    Ok(())
}

/// Rewrites positions as 0..n-1 keeping the current relative order.
fn resequence(conn: &Connection, playlist_id: usize) -> Result<()> {
    let ids: Vec<usize> = ordered_entries(conn, playlist_id)?
        .into_iter()
        .map(|(entry_id, _)| entry_id)
        .collect();
    write_positions(conn, &ids)
}

fn touch_playlist(conn: &Connection, playlist_id: usize) -> Result<()> {
    conn.execute(
        &format!(
            "UPDATE {} SET updated = ?1 WHERE id = ?2",
            PLAYLIST_TABLE_V_0.name
        ),
        params![now_secs(), playlist_id],
    )?;
    Ok(())
}

impl PlaylistStore for SqliteContentStore {
    fn create_playlist(&self, owner_id: usize, fields: &PlaylistFields) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (title, description, image_url, owner_id, is_public)
                VALUES (?1, ?2, ?3, ?4, ?5)",
                PLAYLIST_TABLE_V_0.name
            ),
            params![
                fields.title,
                fields.description,
                fields.image_url,
                owner_id,
                fields.is_public
            ],
        )
        .with_context(|| format!("Failed to create playlist {}", fields.title))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_playlist(&self, playlist_id: usize) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                PLAYLIST_COLUMNS, PLAYLIST_TABLE_V_0.name
            ),
            params![playlist_id],
            playlist_from_row,
        )
        .optional()
        .context("Failed to query playlist")
    }

    fn list_visible_playlists(&self, viewer: Option<usize>) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        query_playlists(
            &conn,
            "WHERE is_public = 1 OR owner_id = ?1 ORDER BY created DESC, id DESC",
            params![viewer],
        )
    }

    fn list_user_playlists(
        &self,
        owner_id: usize,
        include_private: bool,
    ) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        query_playlists(
            &conn,
            "WHERE owner_id = ?1 AND (is_public = 1 OR ?2) ORDER BY created DESC, id DESC",
            params![owner_id, include_private],
        )
    }

    fn update_playlist(&self, playlist_id: usize, fields: &PlaylistFields) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET title = ?1, description = ?2, image_url = ?3, is_public = ?4,
                updated = ?5 WHERE id = ?6",
                PLAYLIST_TABLE_V_0.name
            ),
            params![
                fields.title,
                fields.description,
                fields.image_url,
                fields.is_public,
                now_secs(),
                playlist_id
            ],
        )?;
        Ok(updated > 0)
    }

    fn delete_playlist(&self, playlist_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", PLAYLIST_TABLE_V_0.name),
            params![playlist_id],
        )?;
        Ok(deleted > 0)
    }

    fn list_playlist_songs(&self, playlist_id: usize) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        query_songs(
            &conn,
            "JOIN playlist_song ps ON ps.song_id = s.id \
            WHERE ps.playlist_id = ?1 ORDER BY ps.position, ps.id",
            params![playlist_id],
        )
    }

    fn add_playlist_song(
        &self,
        playlist_id: usize,
        song_id: usize,
        position: Option<i64>,
    ) -> Result<PlaylistSong> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        if !row_exists(&tx, PLAYLIST_TABLE_V_0.name, playlist_id)? {
            return Err(ContentError::NotFound(PLAYLIST_NOT_FOUND).into());
        }
        if !row_exists(&tx, "song", song_id)? {
            return Err(ContentError::NotFound(SONG_NOT_FOUND).into());
        }
        let already_member = ordered_entries(&tx, playlist_id)?
            .iter()
            .any(|(_, member)| *member == song_id);
        if already_member {
            return Err(ContentError::BadRequest(SONG_ALREADY_IN_PLAYLIST.to_string()).into());
        }

        let position = match position {
            Some(requested) => {
                let requested = requested.max(0);
                tx.execute(
                    &format!(
                        "UPDATE {} SET position = position + 1 WHERE playlist_id = ?1 AND position >= ?2",
                        PLAYLIST_SONG_TABLE_V_0.name
                    ),
                    params![playlist_id, requested],
                )?;
                requested
            }
            None => tx.query_row(
                &format!(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM {} WHERE playlist_id = ?1",
                    PLAYLIST_SONG_TABLE_V_0.name
                ),
                params![playlist_id],
                |row| row.get(0),
            )?,
        };

        tx.execute(
            &format!(
                "INSERT INTO {} (playlist_id, song_id, position) VALUES (?1, ?2, ?3)",
                PLAYLIST_SONG_TABLE_V_0.name
            ),
            params![playlist_id, song_id, position],
        )?;
        let entry_id = tx.last_insert_rowid();
        resequence(&tx, playlist_id)?;
        touch_playlist(&tx, playlist_id)?;

        let entry = tx.query_row(
            &format!("{} WHERE ps.id = ?1", ENTRY_SELECT),
            params![entry_id],
            entry_from_row,
        )?;
        tx.commit()?;
        Ok(entry)
    }

    fn remove_playlist_song(&self, playlist_id: usize, song_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE playlist_id = ?1 AND song_id = ?2",
                PLAYLIST_SONG_TABLE_V_0.name
            ),
            params![playlist_id, song_id],
        )?;
        if deleted > 0 {
            resequence(&tx, playlist_id)?;
            touch_playlist(&tx, playlist_id)?;
        }
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn reorder_playlist(
        &self,
        playlist_id: usize,
        order: &[(usize, i64)],
    ) -> Result<ReorderOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if !row_exists(&tx, PLAYLIST_TABLE_V_0.name, playlist_id)? {
            return Err(ContentError::NotFound(PLAYLIST_NOT_FOUND).into());
        }

        let entries = ordered_entries(&tx, playlist_id)?;
        let members: HashMap<usize, usize> = entries
            .iter()
            .enumerate()
            .map(|(index, (_, song_id))| (*song_id, index))
            .collect();

        let mut outcome = ReorderOutcome::default();
        let mut requested: HashMap<usize, i64> = HashMap::new();
        for (song_id, position) in order {
            if members.contains_key(song_id) {
                requested.insert(*song_id, *position);
                outcome.updated += 1;
            } else {
                outcome.missing_song_ids.push(*song_id);
            }
        }

        // Listed songs take their requested slot; ties go to listed songs,
        // then to the previous order.
        let mut keyed: Vec<(i64, bool, usize, usize)> = entries
            .iter()
            .enumerate()
            .map(|(index, (entry_id, song_id))| match requested.get(song_id) {
                Some(position) => (*position, false, index, *entry_id),
                None => (index as i64, true, index, *entry_id),
            })
            .collect();
        keyed.sort();
        let entry_ids: Vec<usize> = keyed.into_iter().map(|(_, _, _, id)| id).collect();
        write_positions(&tx, &entry_ids)?;
        if outcome.updated > 0 {
            touch_playlist(&tx, playlist_id)?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn list_playlist_entries(&self, viewer: Option<usize>) -> Result<Vec<PlaylistSong>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE p.is_public = 1 OR p.owner_id = ?1 ORDER BY ps.added DESC, ps.id DESC",
            ENTRY_SELECT
        ))?;
        let entries = stmt
            .query_map(params![viewer], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn search_public_playlist_titles(&self, term: &str, limit: usize) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        query_playlists(
            &conn,
            "WHERE is_public = 1 AND fold_case(title) LIKE ?1 ESCAPE '\\' \
            ORDER BY created DESC, id DESC LIMIT ?2",
            params![like_pattern(term), limit],
        )
    }

    fn count_playlists(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        count_rows(&conn, &PLAYLIST_TABLE_V_0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_fixtures::{create_tmp_store, playlist_fields, song_fields};
    use super::*;
    use crate::content::content_store::SongStore;

    fn song_ids(store: &SqliteContentStore, playlist_id: usize) -> Vec<usize> {
        store
            .list_playlist_songs(playlist_id)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect()
    }

    fn positions(store: &SqliteContentStore, playlist_id: usize) -> Vec<i64> {
        let mut positions: Vec<i64> = store
            .list_playlist_entries(Some(1))
            .unwrap()
            .iter()
            .filter(|e| e.playlist_id == playlist_id)
            .map(|e| e.position)
            .collect();
        positions.sort();
        positions
    }

    fn setup() -> (SqliteContentStore, tempfile::TempDir, usize, Vec<usize>) {
        let (store, dir) = create_tmp_store();
        let playlist = store
            .create_playlist(1, &playlist_fields("Mix", true))
            .unwrap();
        let songs = ["a", "b", "c"]
            .iter()
            .map(|t| store.create_song(1, &song_fields(t)).unwrap())
            .collect();
        (store, dir, playlist, songs)
    }

    #[test]
    fn appends_songs_in_order() {
        let (store, _dir, playlist, songs) = setup();
        for song in &songs {
            store.add_playlist_song(playlist, *song, None).unwrap();
        }

        assert_eq!(song_ids(&store, playlist), songs);
        assert_eq!(positions(&store, playlist), vec![0, 1, 2]);
    }

    #[test]
    fn inserts_at_explicit_position() {
        let (store, _dir, playlist, songs) = setup();
        store.add_playlist_song(playlist, songs[0], None).unwrap();
        store.add_playlist_song(playlist, songs[1], None).unwrap();
        let entry = store
            .add_playlist_song(playlist, songs[2], Some(0))
            .unwrap();

        assert_eq!(entry.position, 0);
        assert_eq!(entry.song_title, "c");
        assert_eq!(entry.playlist_title, "Mix");
        assert_eq!(song_ids(&store, playlist), vec![songs[2], songs[0], songs[1]]);
        assert_eq!(positions(&store, playlist), vec![0, 1, 2]);
    }

    #[test]
    fn rejects_duplicates_and_missing_sides() {
        let (store, _dir, playlist, songs) = setup();
        store.add_playlist_song(playlist, songs[0], None).unwrap();

        let err = store
            .add_playlist_song(playlist, songs[0], None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContentError>(),
            Some(ContentError::BadRequest(_))
        ));

        let err = store.add_playlist_song(playlist, 999, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContentError>(),
            Some(ContentError::NotFound(SONG_NOT_FOUND))
        ));

        let err = store.add_playlist_song(999, songs[0], None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContentError>(),
            Some(ContentError::NotFound(PLAYLIST_NOT_FOUND))
        ));
        assert_eq!(song_ids(&store, playlist), vec![songs[0]]);
    }

    #[test]
    fn removal_closes_gaps() {
        let (store, _dir, playlist, songs) = setup();
        for song in &songs {
            store.add_playlist_song(playlist, *song, None).unwrap();
        }

        assert!(store.remove_playlist_song(playlist, songs[1]).unwrap());
        assert!(!store.remove_playlist_song(playlist, songs[1]).unwrap());
        assert_eq!(song_ids(&store, playlist), vec![songs[0], songs[2]]);
        assert_eq!(positions(&store, playlist), vec![0, 1]);
    }

    #[test]
    fn reorders_and_reports_missing_songs() {
        let (store, _dir, playlist, songs) = setup();
        for song in &songs {
            store.add_playlist_song(playlist, *song, None).unwrap();
        }

        let outcome = store
            .reorder_playlist(playlist, &[(songs[0], 1), (songs[1], 2), (songs[2], 0), (42, 3)])
            .unwrap();

        assert_eq!(outcome.updated, 3);
        assert_eq!(outcome.missing_song_ids, vec![42]);
        assert_eq!(song_ids(&store, playlist), vec![songs[2], songs[0], songs[1]]);
        assert_eq!(positions(&store, playlist), vec![0, 1, 2]);
    }

    #[test]
    fn partial_reorder_keeps_unlisted_songs_stable() {
        let (store, _dir, playlist, songs) = setup();
        for song in &songs {
            store.add_playlist_song(playlist, *song, None).unwrap();
        }

        store.reorder_playlist(playlist, &[(songs[2], 0)]).unwrap();
        assert_eq!(song_ids(&store, playlist), vec![songs[2], songs[0], songs[1]]);
    }

    #[test]
    fn deleting_song_drops_membership() {
        let (store, _dir, playlist, songs) = setup();
        for song in &songs {
            store.add_playlist_song(playlist, *song, None).unwrap();
        }

        store.delete_song(songs[0]).unwrap();
        assert_eq!(song_ids(&store, playlist), vec![songs[1], songs[2]]);
    }

    #[test]
    fn respects_visibility() {
        let (store, _dir) = create_tmp_store();
        let public = store
            .create_playlist(1, &playlist_fields("Open road", true))
            .unwrap();
        let private = store
            .create_playlist(1, &playlist_fields("Secret road", false))
            .unwrap();

        let visible = |viewer| -> Vec<usize> {
            store
                .list_visible_playlists(viewer)
                .unwrap()
                .iter()
                .map(|p| p.id)
                .collect()
        };
        assert_eq!(visible(None), vec![public]);
        assert_eq!(visible(Some(2)), vec![public]);
        assert_eq!(visible(Some(1)), vec![private, public]);

        assert_eq!(store.list_user_playlists(1, false).unwrap().len(), 1);
        assert_eq!(store.list_user_playlists(1, true).unwrap().len(), 2);

        let found = store.search_public_playlist_titles("ROAD", 20).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, public);
    }

    #[test]
    fn entries_hide_private_playlists() {
        let (store, _dir) = create_tmp_store();
        let song = store.create_song(1, &song_fields("s")).unwrap();
        let private = store
            .create_playlist(1, &playlist_fields("mine", false))
            .unwrap();
        store.add_playlist_song(private, song, None).unwrap();

        assert!(store.list_playlist_entries(None).unwrap().is_empty());
        assert!(store.list_playlist_entries(Some(2)).unwrap().is_empty());
        assert_eq!(store.list_playlist_entries(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn title_search_folds_accented_letters() {
        let (store, _dir) = create_tmp_store();
        let public = store
            .create_playlist(1, &playlist_fields("Éxitos de Ñuñoa", true))
            .unwrap();
        store
            .create_playlist(1, &playlist_fields("ÉXITOS privados", false))
            .unwrap();

        let found = store.search_public_playlist_titles("éxitos", 20).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, public);
        assert_eq!(
            store.search_public_playlist_titles("ÑUÑOA", 20).unwrap().len(),
            1
        );
    }
}
