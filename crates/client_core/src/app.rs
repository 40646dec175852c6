//! Explicit application context: owns the stores, hands them to the page
//! layer and runs each page's mount action.

use std::sync::Arc;

use storage::TokenStore;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    catalog::CatalogStore, routes::Route, session::SessionStore, transport::ApiTransport,
    StoreEvent,
};

pub struct AppContext {
    pub session: Arc<SessionStore>,
    pub catalog: Arc<CatalogStore>,
    events: broadcast::Sender<StoreEvent>,
}

impl AppContext {
    pub async fn new(api: Arc<dyn ApiTransport>, tokens: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(256);
        let session = SessionStore::new(Arc::clone(&api), tokens, events.clone()).await;
        let catalog = CatalogStore::new(api, events.clone());
        Self {
            session: Arc::new(session),
            catalog: Arc::new(catalog),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Runs the store actions a page triggers when it is shown.
    pub async fn open(&self, route: &Route) {
        debug!(route = route.name(), path = %route, "app: opening page");
        match route {
            Route::Movies => self.catalog.get_movies().await,
            Route::MovieDetail(id) => {
                tokio::join!(
                    self.catalog.get_movie_details(id),
                    self.catalog.get_comments(id)
                );
            }
            Route::Logout => self.session.logout().await,
            Route::Home | Route::Register | Route::Login => {}
        }
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
