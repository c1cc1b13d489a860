use crate::sqlite_column;
use crate::sqlite_persistence::{
    datetime_from_secs, now_secs, open_versioned_db, Column, ForeignKey, ForeignKeyOnChange,
    SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
};
use tracing::debug;

use super::auth::{HashedPassword, PasswordHasher};
use super::user_models::{User, UserUpdate};
use super::user_store::{TokenBlacklistStore, UserCredentialsStore, UserStore};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("display_name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_active",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "is_admin",
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
    indices: &[],
    unique_constraints: &[],
};

const USER_PASSWORD_CREDENTIALS_TABLE_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
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

const TOKEN_BLACKLIST_TABLE_V_0: Table = Table {
    name: "token_blacklist",
    columns: &[
        sqlite_column!("jti", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("expires_at", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "blacklisted_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_token_blacklist_expires_at", "expires_at")],
    unique_constraints: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_TABLE_V_0,
        TOKEN_BLACKLIST_TABLE_V_0,
    ],
    migration: None,
}];

const USER_COLUMNS: &str =
    "id, username, email, display_name, is_active, is_admin, created, updated";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        is_active: row.get::<_, i32>(4)? != 0,
        is_admin: row.get::<_, i32>(5)? != 0,
        created_at: datetime_from_secs(row.get(6)?),
        updated_at: datetime_from_secs(row.get(7)?),
    })
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_user(&self, column: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE {} = ?1",
                USER_COLUMNS, USER_TABLE_V_0.name, column
            ),
            params![value],
            user_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to query user by {}", column))
    }

    fn set_user_flag(&self, user_id: usize, column: &str, value: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1, updated = ?2 WHERE id = ?3",
                USER_TABLE_V_0.name, column
            ),
            params![value as i32, now_secs(), user_id],
        )?;
        Ok(())
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(
        &self,
        username: &str,
        email: &str,
        display_name: &str,
        password: &HashedPassword,
    ) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} (username, email, display_name) VALUES (?1, ?2, ?3)",
                USER_TABLE_V_0.name
            ),
            params![username, email, display_name],
        )
        .with_context(|| format!("Failed to create user {}", username))?;
        let user_id = tx.last_insert_rowid() as usize;
        tx.execute(
            &format!(
                "INSERT INTO {} (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
                USER_PASSWORD_CREDENTIALS_TABLE_V_0.name
            ),
            params![
                user_id,
                password.salt,
                password.hash,
                password.hasher.to_string()
            ],
        )?;
        tx.commit()?;
        debug!("Created user {} with id {}", username, user_id);
        Ok(user_id)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        self.query_user("id", &user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user("email", &email)
    }

    fn get_user_id_by_username(&self, username: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT id FROM {} WHERE username = ?1",
                USER_TABLE_V_0.name
            ),
            params![username],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query user id")
    }

    fn update_user(&self, user_id: usize, update: &UserUpdate) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET
                    username = COALESCE(?1, username),
                    email = COALESCE(?2, email),
                    display_name = COALESCE(?3, display_name),
                    updated = ?4
                WHERE id = ?5",
                USER_TABLE_V_0.name
            ),
            params![
                update.username,
                update.email,
                update.display_name,
                now_secs(),
                user_id
            ],
        )
        .with_context(|| format!("Failed to update user {}", user_id))?;
        Ok(())
    }

    fn set_user_active(&self, user_id: usize, active: bool) -> Result<()> {
        self.set_user_flag(user_id, "is_active", active)
    }

    fn set_user_admin(&self, user_id: usize, admin: bool) -> Result<()> {
        self.set_user_flag(user_id, "is_admin", admin)
    }

    fn count_users(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", USER_TABLE_V_0.name),
            [],
            |row| row.get(0),
        )?)
    }
}

impl UserCredentialsStore for SqliteUserStore {
    fn get_password_credentials(&self, user_id: usize) -> Result<Option<HashedPassword>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!(
                    "SELECT salt, hash, hasher FROM {} WHERE user_id = ?1",
                    USER_PASSWORD_CREDENTIALS_TABLE_V_0.name
                ),
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((salt, hash, hasher)) => Ok(Some(HashedPassword {
                salt,
                hash,
                hasher: PasswordHasher::from_str(&hasher)?,
            })),
        }
    }

    fn set_password_credentials(&self, user_id: usize, password: &HashedPassword) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id) DO UPDATE SET salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
                USER_PASSWORD_CREDENTIALS_TABLE_V_0.name
            ),
            params![
                user_id,
                password.salt,
                password.hash,
                password.hasher.to_string()
            ],
        )?;
        Ok(())
    }
}

impl TokenBlacklistStore for SqliteUserStore {
    fn blacklist_token(&self, jti: &str, user_id: usize, expires_at: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (jti, user_id, expires_at) VALUES (?1, ?2, ?3)",
                TOKEN_BLACKLIST_TABLE_V_0.name
            ),
            params![jti, user_id, expires_at],
        )?;
        Ok(inserted == 1)
    }

    fn is_token_blacklisted(&self, jti: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let found = conn
            .query_row(
                &format!(
                    "SELECT 1 FROM {} WHERE jti = ?1",
                    TOKEN_BLACKLIST_TABLE_V_0.name
                ),
                params![jti],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn prune_expired_blacklist(&self, now: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE expires_at < ?1",
                TOKEN_BLACKLIST_TABLE_V_0.name
            ),
            params![now],
        )?;
        Ok(deleted)
    }
}
