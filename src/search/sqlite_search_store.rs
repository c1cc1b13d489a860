use super::search_models::{
    SearchHistoryEntry, SearchIndexEntry, Suggestion, SuggestionCategory,
};
use super::search_store::SearchStore;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    datetime_from_secs, now_secs, open_versioned_db, Column, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

/// V 0
const SEARCH_INDEX_TABLE_V_0: Table = Table {
    name: "search_index",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("term", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "song_ids",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'[]'")
        ),
        sqlite_column!(
            "playlist_ids",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'[]'")
        ),
        sqlite_column!(
            "frequency",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_search_index_frequency", "frequency")],
    unique_constraints: &[],
};

const SEARCH_HISTORY_TABLE_V_0: Table = Table {
    name: "search_history",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("term", &SqlType::Text, non_null = true),
        sqlite_column!(
            "results_found",
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
    ],
    indices: &[("idx_search_history_user_id", "user_id")],
    unique_constraints: &[],
};

const SEARCH_SUGGESTION_TABLE_V_0: Table = Table {
    name: "search_suggestion",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("term", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!(
            "popularity",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "active",
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
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SEARCH_INDEX_TABLE_V_0,
        SEARCH_HISTORY_TABLE_V_0,
        SEARCH_SUGGESTION_TABLE_V_0,
    ],
    migration: None,
}];

const INDEX_COLUMNS: &str = "term, song_ids, playlist_ids, frequency, updated, created";

fn json_ids(row: &Row, index: usize) -> rusqlite::Result<Vec<usize>> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn index_entry_from_row(row: &Row) -> rusqlite::Result<SearchIndexEntry> {
    Ok(SearchIndexEntry {
        term: row.get(0)?,
        song_ids: json_ids(row, 1)?,
        playlist_ids: json_ids(row, 2)?,
        frequency: row.get::<_, i64>(3)? as u64,
        updated_at: datetime_from_secs(row.get(4)?),
        created_at: datetime_from_secs(row.get(5)?),
    })
}

fn suggestion_from_row(row: &Row) -> rusqlite::Result<Suggestion> {
    let category: String = row.get(2)?;
    let category = SuggestionCategory::parse(&category)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(2, category, Type::Text))?;
    Ok(Suggestion {
        id: row.get(0)?,
        term: row.get(1)?,
        category,
        popularity: row.get(3)?,
        active: row.get(4)?,
        created_at: datetime_from_secs(row.get(5)?),
    })
}

fn query_index_entry(conn: &Connection, term: &str) -> Result<Option<SearchIndexEntry>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE term = ?1",
            INDEX_COLUMNS, SEARCH_INDEX_TABLE_V_0.name
        ),
        params![term],
        index_entry_from_row,
    )
    .optional()
    .context("Failed to query search index")
}

#[derive(Clone)]
pub struct SqliteSearchStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSearchStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteSearchStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl SearchStore for SqliteSearchStore {
    fn record_search(
        &self,
        term: &str,
        song_ids: &[usize],
        playlist_ids: &[usize],
    ) -> Result<SearchIndexEntry> {
        let song_ids = serde_json::to_string(song_ids)?;
        let playlist_ids = serde_json::to_string(playlist_ids)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (term, song_ids, playlist_ids) VALUES (?1, ?2, ?3)
                ON CONFLICT(term) DO UPDATE SET
                    song_ids = excluded.song_ids,
                    playlist_ids = excluded.playlist_ids,
                    frequency = frequency + 1,
                    updated = ?4",
                SEARCH_INDEX_TABLE_V_0.name
            ),
            params![term, song_ids, playlist_ids, now_secs()],
        )
        .with_context(|| format!("Failed to index search term {}", term))?;
        query_index_entry(&conn, term)?
            .with_context(|| format!("Search term {} missing after upsert", term))
    }

    fn get_index_entry(&self, term: &str) -> Result<Option<SearchIndexEntry>> {
        let conn = self.conn.lock().unwrap();
        query_index_entry(&conn, term)
    }

    fn popular_terms(&self, limit: usize) -> Result<Vec<SearchIndexEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY frequency DESC, updated DESC, id DESC LIMIT ?1",
            INDEX_COLUMNS, SEARCH_INDEX_TABLE_V_0.name
        ))?;
        let entries = stmt
            .query_map(params![limit], index_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn append_history(&self, user_id: usize, term: &str, results_found: usize) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, term, results_found) VALUES (?1, ?2, ?3)",
                SEARCH_HISTORY_TABLE_V_0.name
            ),
            params![user_id, term, results_found],
        )?;
        Ok(())
    }

    fn list_history(&self, user_id: usize, limit: usize) -> Result<Vec<SearchHistoryEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, term, results_found, created FROM {}
            WHERE user_id = ?1 ORDER BY created DESC, id DESC LIMIT ?2",
            SEARCH_HISTORY_TABLE_V_0.name
        ))?;
        let entries = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(SearchHistoryEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    term: row.get(2)?,
                    results_found: row.get(3)?,
                    created_at: datetime_from_secs(row.get(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn add_suggestion(
        &self,
        term: &str,
        category: SuggestionCategory,
        popularity: i64,
    ) -> Result<Option<Suggestion>> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (term, category, popularity) VALUES (?1, ?2, ?3)",
                SEARCH_SUGGESTION_TABLE_V_0.name
            ),
            params![term, category.as_str(), popularity],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        let suggestion = conn.query_row(
            &format!(
                "SELECT id, term, category, popularity, active, created FROM {} WHERE id = ?1",
                SEARCH_SUGGESTION_TABLE_V_0.name
            ),
            params![conn.last_insert_rowid()],
            suggestion_from_row,
        )?;
        Ok(Some(suggestion))
    }

    fn list_active_suggestions(&self, limit: usize) -> Result<Vec<Suggestion>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, term, category, popularity, active, created FROM {}
            WHERE active = 1 ORDER BY popularity DESC, id ASC LIMIT ?1",
            SEARCH_SUGGESTION_TABLE_V_0.name
        ))?;
        let suggestions = stmt
            .query_map(params![limit], suggestion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(suggestions)
    }
}
