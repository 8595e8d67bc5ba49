//! Show catalog lookup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::ShowId;
use domain::ShowDetails;
use tokio::sync::RwLock;

use crate::error::{ReservationError, Result};

/// Source of show pricing and capacity.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns an active show.
    ///
    /// Missing and inactive shows are both `ShowNotFound`.
    async fn get_show(&self, show_id: ShowId) -> Result<ShowDetails>;
}

#[derive(Debug, Default)]
struct CatalogState {
    shows: HashMap<ShowId, ShowDetails>,
    inactive: HashSet<ShowId>,
}

/// In-memory catalog for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a show.
    pub async fn add_show(&self, show: ShowDetails) {
        let mut state = self.state.write().await;
        state.inactive.remove(&show.id);
        state.shows.insert(show.id, show);
    }

    /// Hides a show from booking without forgetting it.
    pub async fn deactivate(&self, show_id: ShowId) {
        self.state.write().await.inactive.insert(show_id);
    }

    /// Returns every active show.
    pub async fn active_shows(&self) -> Vec<ShowDetails> {
        let state = self.state.read().await;
        state
            .shows
            .values()
            .filter(|show| !state.inactive.contains(&show.id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_show(&self, show_id: ShowId) -> Result<ShowDetails> {
        let state = self.state.read().await;
        if state.inactive.contains(&show_id) {
            return Err(ReservationError::ShowNotFound(show_id));
        }
        state
            .shows
            .get(&show_id)
            .cloned()
            .ok_or(ReservationError::ShowNotFound(show_id))
    }
}
