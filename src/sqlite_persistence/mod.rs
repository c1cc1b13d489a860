mod versioned_schema;

pub use versioned_schema::{
    open_versioned_db, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};

/// Current unix time in seconds, the unit every timestamp column uses.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Converts a unix-seconds column value into a UTC datetime for serialization.
pub fn datetime_from_secs(secs: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
