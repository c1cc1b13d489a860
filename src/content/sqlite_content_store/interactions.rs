use super::{SqliteContentStore, INTERACTION_TABLE_V_0, PLAYLIST_TABLE_V_0, SONG_TABLE_V_0};
use crate::content::content_store::InteractionStore;
use crate::content::error::{ContentError, PLAYLIST_NOT_FOUND, SONG_NOT_FOUND};
use crate::content::models::{
    Interaction, InteractionKind, InteractionStats, InteractionTarget, ToggleOutcome,
};
use crate::sqlite_persistence::datetime_from_secs;
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

const INTERACTION_SELECT: &str = "SELECT i.id, i.user_id, i.song_id, i.playlist_id, \
    i.target_user_id, i.kind, i.created, s.title, p.title FROM interaction i \
    LEFT JOIN song s ON s.id = i.song_id \
    LEFT JOIN playlist p ON p.id = i.playlist_id";

fn interaction_from_row(row: &Row) -> rusqlite::Result<Interaction> {
    let kind: String = row.get(5)?;
    let kind = InteractionKind::parse(&kind)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(5, kind, Type::Text))?;
    Ok(Interaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        song_id: row.get(2)?,
        playlist_id: row.get(3)?,
        target_user_id: row.get(4)?,
        kind,
        created_at: datetime_from_secs(row.get(6)?),
        song_title: row.get(7)?,
        playlist_title: row.get(8)?,
    })
}

fn target_column(target: InteractionTarget) -> (&'static str, usize) {
    match target {
        InteractionTarget::Song(id) => ("song_id", id),
        InteractionTarget::Playlist(id) => ("playlist_id", id),
        InteractionTarget::User(id) => ("target_user_id", id),
    }
}

/// Fails with `ContentError::NotFound` when a song or playlist target is gone.
/// User targets live in another database and are checked by the caller.
fn ensure_target_exists(conn: &Connection, target: InteractionTarget) -> Result<()> {
    let (table, id, message) = match target {
        InteractionTarget::Song(id) => (SONG_TABLE_V_0.name, id, SONG_NOT_FOUND),
        InteractionTarget::Playlist(id) => (PLAYLIST_TABLE_V_0.name, id, PLAYLIST_NOT_FOUND),
        InteractionTarget::User(_) => return Ok(()),
    };
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", table),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    match found {
        Some(()) => Ok(()),
        None => Err(ContentError::NotFound(message).into()),
    }
}

fn find_interaction_id(
    conn: &Connection,
    user_id: usize,
    kind: InteractionKind,
    target: InteractionTarget,
) -> Result<Option<usize>> {
    let (column, target_id) = target_column(target);
    Ok(conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE user_id = ?1 AND kind = ?2 AND {} = ?3",
                INTERACTION_TABLE_V_0.name, column
            ),
            params![user_id, kind.as_str(), target_id],
            |row| row.get(0),
        )
        .optional()?)
}

fn insert_interaction(
    conn: &Connection,
    user_id: usize,
    kind: InteractionKind,
    target: InteractionTarget,
) -> Result<Interaction> {
    let (column, target_id) = target_column(target);
    conn.execute(
        &format!(
            "INSERT INTO {} (user_id, kind, {}) VALUES (?1, ?2, ?3)",
            INTERACTION_TABLE_V_0.name, column
        ),
        params![user_id, kind.as_str(), target_id],
    )?;
    let id = conn.last_insert_rowid();
    adjust_song_counter(conn, kind, target, 1)?;
    Ok(conn.query_row(
        &format!("{} WHERE i.id = ?1", INTERACTION_SELECT),
        params![id],
        interaction_from_row,
    )?)
}

/// Moves the denormalized counter of a song target by `delta`, never below zero.
fn adjust_song_counter(
    conn: &Connection,
    kind: InteractionKind,
    target: InteractionTarget,
    delta: i64,
) -> Result<()> {
    let (InteractionTarget::Song(song_id), Some(counter)) = (target, kind.song_counter_column())
    else {
        return Ok(());
    };
    conn.execute(
        &format!(
            "UPDATE {} SET {counter} = MAX({counter} + ?1, 0) WHERE id = ?2",
            SONG_TABLE_V_0.name
        ),
        params![delta, song_id],
    )?;
    Ok(())
}

fn kind_filter(kind: Option<InteractionKind>) -> Option<&'static str> {
    kind.map(|k| k.as_str())
}

impl InteractionStore for SqliteContentStore {
    fn toggle_interaction(
        &self,
        user_id: usize,
        kind: InteractionKind,
        target: InteractionTarget,
    ) -> Result<ToggleOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        ensure_target_exists(&tx, target)?;

        let outcome = match find_interaction_id(&tx, user_id, kind, target)? {
            Some(existing) => {
                tx.execute(
                    &format!("DELETE FROM {} WHERE id = ?1", INTERACTION_TABLE_V_0.name),
                    params![existing],
                )?;
                adjust_song_counter(&tx, kind, target, -1)?;
                ToggleOutcome::Removed
            }
            None => ToggleOutcome::Created(insert_interaction(&tx, user_id, kind, target)?),
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn create_interaction(
        &self,
        user_id: usize,
        kind: InteractionKind,
        target: InteractionTarget,
    ) -> Result<Interaction> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        ensure_target_exists(&tx, target)?;

        if find_interaction_id(&tx, user_id, kind, target)?.is_some() {
            return Err(ContentError::BadRequest(format!(
                "Ya has hecho {} a este elemento",
                kind.as_str()
            ))
            .into());
        }
        let interaction = insert_interaction(&tx, user_id, kind, target)?;

        tx.commit()?;
        Ok(interaction)
    }

    fn get_interaction(&self, interaction_id: usize) -> Result<Option<Interaction>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE i.id = ?1", INTERACTION_SELECT),
            params![interaction_id],
            interaction_from_row,
        )
        .optional()
        .context("Failed to query interaction")
    }

    fn delete_interaction(&self, interaction_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing = tx
            .query_row(
                &format!("{} WHERE i.id = ?1", INTERACTION_SELECT),
                params![interaction_id],
                interaction_from_row,
            )
            .optional()?;
        let Some(interaction) = existing else {
            return Ok(false);
        };

        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", INTERACTION_TABLE_V_0.name),
            params![interaction_id],
        )?;
        if let Some(song_id) = interaction.song_id {
            adjust_song_counter(&tx, interaction.kind, InteractionTarget::Song(song_id), -1)?;
        }

        tx.commit()?;
        Ok(true)
    }

    fn list_user_interactions(
        &self,
        user_id: usize,
        kind: Option<InteractionKind>,
    ) -> Result<Vec<Interaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE i.user_id = ?1 AND (?2 IS NULL OR i.kind = ?2) ORDER BY i.created DESC, i.id DESC",
            INTERACTION_SELECT
        ))?;
        let interactions = stmt
            .query_map(params![user_id, kind_filter(kind)], interaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(interactions)
    }

    fn user_interaction_stats(
        &self,
        user_id: usize,
        kind: Option<InteractionKind>,
    ) -> Result<InteractionStats> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT kind, COUNT(*) FROM {} WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2) GROUP BY kind",
            INTERACTION_TABLE_V_0.name
        ))?;
        let mut rows = stmt.query(params![user_id, kind_filter(kind)])?;

        let mut stats = InteractionStats::default();
        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let count: usize = row.get(1)?;
            match InteractionKind::parse(&kind) {
                Some(InteractionKind::Like) => stats.total_likes = count,
                Some(InteractionKind::Repost) => stats.total_reposts = count,
                Some(InteractionKind::Follow) => stats.total_follows = count,
                None => {}
            }
        }
        Ok(stats)
    }
}
