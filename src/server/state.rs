use std::sync::Arc;

use crate::chat::{ChatDispatcher, MessageFormatter, WordListFilter};
use crate::config::Settings;
use crate::connection_manager::ConnectionManager;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub connection_manager: Arc<ConnectionManager>,
    pub dispatcher: Arc<ChatDispatcher>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let connection_manager = Arc::new(ConnectionManager::with_limit(
            settings.websocket.max_connections,
        ));
        let filter = WordListFilter::new(
            &settings.filter.extra_words,
            &settings.filter.allowed_words,
        );
        tracing::debug!(words = filter.word_count(), "Content filter loaded");

        let dispatcher = Arc::new(ChatDispatcher::new(
            connection_manager.clone(),
            MessageFormatter::new(settings.chat.maps_base_url.clone()),
            Arc::new(filter),
            settings.chat.admin_name.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            connection_manager,
            dispatcher,
        }
    }
}
