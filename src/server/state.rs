use std::sync::Arc;

use crate::storage::FeedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FeedStore>,
}

impl AppState {
    pub fn new(store: FeedStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}
