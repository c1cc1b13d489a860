use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to every schema version stored in `PRAGMA user_version`, so that
/// a database not created by us (user_version 0) is never mistaken for version 0.
pub const BASE_DB_VERSION: usize = 50000;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn parse(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    SetNull,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::SetNull => "SET NULL",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column<'a> {
    pub name: &'a str,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'a str>,
    pub foreign_key: Option<&'a ForeignKey>,
}

impl Column<'_> {
    fn definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.as_sql());
        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.non_null {
            sql.push_str(" NOT NULL");
        }
        if self.is_unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default_value) = self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default_value));
        }
        if let Some(fk) = self.foreign_key {
            sql.push_str(&format!(
                " REFERENCES {}({}) ON DELETE {}",
                fk.foreign_table,
                fk.foreign_column,
                fk.on_delete.as_sql()
            ));
        }
        sql
    }
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static>],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

/// A column as reported back by `PRAGMA table_info`.
struct ActualColumn {
    name: String,
    sql_type: String,
    non_null: bool,
    default_value: Option<String>,
    is_primary_key: bool,
}

fn strip_parentheses(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(s)
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut parts: Vec<String> = self.columns.iter().map(Column::definition).collect();
        for unique in self.unique_constraints {
            parts.push(format!("UNIQUE ({})", unique.join(", ")));
        }
        conn.execute(
            &format!("CREATE TABLE {} ({});", self.name, parts.join(", ")),
            params![],
        )
        .with_context(|| format!("Failed to create table {}", self.name))?;

        for (index_name, columns) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, columns),
                params![],
            )?;
        }
        Ok(())
    }

    fn actual_columns(&self, conn: &Connection) -> Result<Vec<ActualColumn>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    is_primary_key: row.get::<_, i32>(5)? > 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        let actual_columns = self.actual_columns(conn)?;
        if actual_columns.is_empty() {
            bail!("Table {} does not exist", self.name);
        }
        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {} ({})",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if SqlType::parse(&actual.sql_type) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}",
                    self.name,
                    expected.name,
                    expected.non_null
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key
                );
            }
            let actual_default = actual.default_value.as_deref().map(strip_parentheses);
            let expected_default = expected.default_value.map(strip_parentheses);
            if actual_default != expected_default {
                bail!(
                    "Table {} column {} default mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected_default,
                    actual_default
                );
            }
        }

        for (index_name, _) in self.indices {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1 AND tbl_name = ?2",
                    params![index_name, self.name],
                    |_| Ok(()),
                )
                .is_ok();
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }

        self.validate_unique_constraints(conn)?;
        self.validate_foreign_keys(conn)
    }

    fn validate_unique_constraints(&self, conn: &Connection) -> Result<()> {
        if self.unique_constraints.is_empty() {
            return Ok(());
        }

        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        let unique_indices = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
            .filter_map(|r| r.ok())
            .filter(|(_, unique)| *unique == 1)
            .map(|(name, _)| name)
            .collect::<Vec<_>>();

        let mut column_sets: Vec<Vec<String>> = Vec::with_capacity(unique_indices.len());
        for index_name in unique_indices {
            let mut stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut columns = stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .collect::<Result<Vec<_>, _>>()?;
            columns.sort();
            column_sets.push(columns);
        }

        for expected in self.unique_constraints {
            let mut expected_sorted: Vec<&str> = expected.to_vec();
            expected_sorted.sort();
            let found = column_sets
                .iter()
                .any(|set| set.iter().map(String::as_str).eq(expected_sorted.iter().copied()));
            if !found {
                bail!(
                    "Table {} is missing unique constraint on ({})",
                    self.name,
                    expected.join(", ")
                );
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        // (from, table, to, on_delete)
        let actual_fks = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for column in self.columns {
            let Some(expected) = column.foreign_key else {
                continue;
            };
            let matches = actual_fks.iter().any(|(from, table, to, on_delete)| {
                from == column.name
                    && table == expected.foreign_table
                    && to == expected.foreign_column
                    && on_delete == expected.on_delete.as_sql()
            });
            if !matches {
                bail!(
                    "Table {} column {} foreign key mismatch: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    expected.foreign_table,
                    expected.foreign_column,
                    expected.on_delete.as_sql()
                );
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        set_user_version(conn, self.version)
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

fn set_user_version(conn: &Connection, version: usize) -> Result<()> {
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + version),
        [],
    )?;
    Ok(())
}

fn read_user_version(conn: &Connection) -> Result<i64> {
    let raw = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<_, i64>(0))
        .context("Failed to read database version")?;
    Ok(raw - BASE_DB_VERSION as i64)
}

/// Opens (or creates) a SQLite database described by `schemas`, the ordered list of
/// every schema version the store ever had.
///
/// A fresh file gets the latest schema. An existing file is validated against the
/// schema of the version it declares and then migrated forward, one version at a
/// time, inside a single transaction.
pub fn open_versioned_db<P: AsRef<Path>>(
    db_path: P,
    schemas: &[VersionedSchema],
) -> Result<Connection> {
    let db_path = db_path.as_ref();
    let latest = schemas.last().context("No schema versions defined")?;

    let mut conn = if db_path.exists() {
        Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database {:?}", db_path))?
    } else {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to create database {:?}", db_path))?;
        latest.create(&conn)?;
        conn
    };
    conn.execute("PRAGMA foreign_keys = ON;", [])?;

    let version = read_user_version(&conn)?;
    if version < 0 {
        bail!(
            "Database {:?} was not created by this server (version {})",
            db_path,
            version + BASE_DB_VERSION as i64
        );
    }
    let version = version as usize;
    let current = schemas
        .get(version)
        .with_context(|| format!("Database version {} is too new", version))?;
    current
        .validate(&conn)
        .with_context(|| format!("Database {:?} does not match schema v{}", db_path, version))?;

    if version < latest.version {
        let tx = conn.transaction()?;
        for schema in schemas.iter().skip(version + 1) {
            info!(
                "Migrating {:?} from version {} to {}",
                db_path,
                schema.version - 1,
                schema.version
            );
            if let Some(migration) = schema.migration {
                migration(&tx)?;
            }
        }
        set_user_version(&tx, latest.version)?;
        tx.commit()?;
        latest.validate(&conn)?;
    }

    Ok(conn)
}
