use super::search_models::{
    SearchHistoryEntry, SearchIndexEntry, Suggestion, SuggestionCategory,
};
use anyhow::Result;

pub trait SearchStore: Send + Sync {
    /// Inserts the term with frequency 1, or refreshes its cached result ids
    /// and increments its frequency when it is already indexed.
    fn record_search(
        &self,
        term: &str,
        song_ids: &[usize],
        playlist_ids: &[usize],
    ) -> Result<SearchIndexEntry>;

    /// Returns Ok(None) if the term was never searched.
    fn get_index_entry(&self, term: &str) -> Result<Option<SearchIndexEntry>>;

    /// Returns the most frequent terms, most recently refreshed first on ties.
    fn popular_terms(&self, limit: usize) -> Result<Vec<SearchIndexEntry>>;

    fn append_history(&self, user_id: usize, term: &str, results_found: usize) -> Result<()>;

    /// Returns the searches of a user, newest first.
    fn list_history(&self, user_id: usize, limit: usize) -> Result<Vec<SearchHistoryEntry>>;

    /// Returns Ok(None) if a suggestion with the same term already exists.
    fn add_suggestion(
        &self,
        term: &str,
        category: SuggestionCategory,
        popularity: i64,
    ) -> Result<Option<Suggestion>>;

    /// Returns active suggestions, most popular first.
    fn list_active_suggestions(&self, limit: usize) -> Result<Vec<Suggestion>>;
}
