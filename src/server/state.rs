use axum::extract::FromRef;

use crate::content::ContentManager;
use crate::search::SearchManager;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedContentManager = Arc<ContentManager>;
pub type GuardedSearchManager = Arc<SearchManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub content_manager: GuardedContentManager,
    pub search_manager: GuardedSearchManager,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        user_manager: GuardedUserManager,
        content_manager: GuardedContentManager,
        search_manager: GuardedSearchManager,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            user_manager,
            content_manager,
            search_manager,
        }
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedContentManager {
    fn from_ref(input: &ServerState) -> Self {
        input.content_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedSearchManager {
    fn from_ref(input: &ServerState) -> Self {
        input.search_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
