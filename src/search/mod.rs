mod search_manager;
pub mod search_models;
mod search_store;
mod sqlite_search_store;

pub use search_manager::SearchManager;
pub use search_store::SearchStore;
pub use sqlite_search_store::SqliteSearchStore;
