pub mod app;
pub mod catalog;
pub mod routes;
pub mod session;
pub mod token;
pub mod transport;

pub use app::AppContext;
pub use catalog::{CatalogState, CatalogStore};
pub use routes::Route;
pub use session::{LoginOutcome, SessionState, SessionStore};
pub use transport::{ApiTransport, HttpTransport};

/// Snapshot broadcast after every store mutation so views can re-render.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Session(SessionState),
    Catalog(CatalogState),
}

#[cfg(test)]
#[path = "tests/mock_backend.rs"]
mod mock_backend;
