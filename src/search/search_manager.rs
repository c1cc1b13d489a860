use super::search_models::{
    SearchHistoryEntry, SearchIndexEntry, SearchResults, Suggestion, SuggestionCategory,
    SuggestionRequest,
};
use super::search_store::SearchStore;
use crate::content::{ContentError, ContentStore};
use crate::validation::{FieldErrors, MAX_TITLE_LEN};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum songs and maximum playlists returned by one search.
pub const RESULTS_LIMIT: usize = 20;
pub const SUGGESTIONS_LIMIT: usize = 10;
pub const POPULAR_LIMIT: usize = 10;
pub const HISTORY_LIMIT: usize = 50;

pub struct SearchManager {
    search_store: Arc<dyn SearchStore>,
    content_store: Arc<dyn ContentStore>,
}

impl SearchManager {
    pub fn new(search_store: Arc<dyn SearchStore>, content_store: Arc<dyn ContentStore>) -> Self {
        Self {
            search_store,
            content_store,
        }
    }

    /// Matches song titles and public playlist titles. Recording the term in
    /// the index and in the caller's history never fails the search.
    pub fn search(&self, user_id: Option<usize>, query: Option<&str>) -> Result<SearchResults> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Err(ContentError::BadRequest(
                "Debes proporcionar un parámetro de búsqueda (?q=...)".to_string(),
            )
            .into());
        }

        let songs = self.content_store.search_song_titles(query, RESULTS_LIMIT)?;
        let playlists = self
            .content_store
            .search_public_playlist_titles(query, RESULTS_LIMIT)?;
        let total = songs.len() + playlists.len();

        if let Some(user_id) = user_id {
            if let Err(err) = self.search_store.append_history(user_id, query, total) {
                warn!("Failed to record search history for user {}: {}", user_id, err);
            }
        }
        let song_ids: Vec<usize> = songs.iter().map(|s| s.id).collect();
        let playlist_ids: Vec<usize> = playlists.iter().map(|p| p.id).collect();
        match self
            .search_store
            .record_search(&query.to_lowercase(), &song_ids, &playlist_ids)
        {
            Ok(entry) => debug!("Search '{}' seen {} times", entry.term, entry.frequency),
            Err(err) => warn!("Failed to index search term '{}': {}", query, err),
        }

        Ok(SearchResults {
            query: query.to_string(),
            canciones: songs,
            playlists,
            total_resultados: total,
        })
    }

    pub fn suggestions(&self) -> Result<Vec<Suggestion>> {
        self.search_store.list_active_suggestions(SUGGESTIONS_LIMIT)
    }

    pub fn add_suggestion(&self, request: SuggestionRequest) -> Result<Suggestion> {
        let mut errors = FieldErrors::new();
        errors.require_text("termino", request.termino.as_deref(), MAX_TITLE_LEN);
        let category = match request.categoria.as_deref() {
            None | Some("") => {
                errors.add("categoria", "Este campo es requerido.");
                None
            }
            Some(raw) => {
                let parsed = SuggestionCategory::parse(raw);
                if parsed.is_none() {
                    errors.add("categoria", format!("\"{}\" no es una elección válida.", raw));
                }
                parsed
            }
        };
        let Some(category) = category.filter(|_| errors.is_empty()) else {
            return Err(ContentError::Invalid(errors).into());
        };

        let term = request.termino.as_deref().unwrap_or_default().trim();
        self.search_store
            .add_suggestion(term, category, request.popularidad.unwrap_or(0))?
            .ok_or_else(|| {
                ContentError::BadRequest("Ya existe una sugerencia con ese término".to_string())
                    .into()
            })
    }

    pub fn history(&self, user_id: usize) -> Result<Vec<SearchHistoryEntry>> {
        self.search_store.list_history(user_id, HISTORY_LIMIT)
    }

    pub fn popular_terms(&self) -> Result<Vec<SearchIndexEntry>> {
        self.search_store.popular_terms(POPULAR_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::models::{PlaylistFields, SongFields};
    use crate::content::{PlaylistStore, SongStore, SqliteContentStore};
    use crate::search::SqliteSearchStore;
    use tempfile::TempDir;

    struct Fixture {
        manager: SearchManager,
        content: Arc<SqliteContentStore>,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let content = Arc::new(SqliteContentStore::new(dir.path().join("content.db")).unwrap());
        let search = Arc::new(SqliteSearchStore::new(dir.path().join("search.db")).unwrap());
        Fixture {
            manager: SearchManager::new(search, content.clone()),
            content,
            _dir: dir,
        }
    }

    fn add_song(content: &SqliteContentStore, title: &str) -> usize {
        content
            .create_song(
                1,
                &SongFields {
                    title: title.to_string(),
                    description: None,
                    file_url: "https://cdn.example.com/a.mp3".to_string(),
                    image_url: None,
                    duration_secs: None,
                    genre: None,
                    album_id: None,
                },
            )
            .unwrap()
    }

    fn add_playlist(content: &SqliteContentStore, title: &str, is_public: bool) -> usize {
        content
            .create_playlist(
                1,
                &PlaylistFields {
                    title: title.to_string(),
                    description: None,
                    image_url: None,
                    is_public,
                },
            )
            .unwrap()
    }

    #[test]
    fn searches_titles_and_skips_private_playlists() {
        let f = fixture();
        let song = add_song(&f.content, "Night Drive");
        let public = add_playlist(&f.content, "night mix", true);
        add_playlist(&f.content, "Night secrets", false);

        let results = f.manager.search(None, Some("  NIGHT ")).unwrap();
        assert_eq!(results.query, "NIGHT");
        assert_eq!(results.canciones[0].id, song);
        assert_eq!(results.playlists.len(), 1);
        assert_eq!(results.playlists[0].id, public);
        assert_eq!(results.total_resultados, 2);
    }

    #[test]
    fn empty_query_is_rejected() {
        let f = fixture();
        for query in [None, Some(""), Some("   ")] {
            let err = f.manager.search(Some(1), query).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ContentError>(),
                Some(ContentError::BadRequest(_))
            ));
        }
        assert!(f.manager.history(1).unwrap().is_empty());
    }

    #[test]
    fn records_history_only_for_known_callers() {
        let f = fixture();
        add_song(&f.content, "Rain");

        f.manager.search(None, Some("rain")).unwrap();
        f.manager.search(Some(4), Some("Rain")).unwrap();

        let history = f.manager.history(4).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].term, "Rain");
        assert_eq!(history[0].results_found, 1);

        let popular = f.manager.popular_terms().unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].term, "rain");
        assert_eq!(popular[0].frequency, 2);
    }

    #[test]
    fn validates_suggestions() {
        let f = fixture();
        let err = f
            .manager
            .add_suggestion(SuggestionRequest {
                termino: Some("x".to_string()),
                categoria: Some("mood".to_string()),
                popularidad: None,
            })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContentError>(),
            Some(ContentError::Invalid(_))
        ));

        let request = || SuggestionRequest {
            termino: Some(" lofi ".to_string()),
            categoria: Some("genero".to_string()),
            popularidad: Some(3),
        };
        let created = f.manager.add_suggestion(request()).unwrap();
        assert_eq!(created.term, "lofi");
        assert!(f.manager.add_suggestion(request()).is_err());
        assert_eq!(f.manager.suggestions().unwrap().len(), 1);
    }
}
