//! SoundClone Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod content;
pub mod search;
pub mod server;
pub mod sqlite_persistence;
pub mod user;
pub mod validation;

// Re-export commonly used types for convenience
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
pub use user::{SqliteUserStore, UserRole, UserStore};
