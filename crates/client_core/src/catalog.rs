//! Movie list, selected movie and its comments, each fetched independently.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{Comment, Movie, MovieId},
    error::ApiError,
    protocol::{comments_route, movie_route, movies_route, CommentsResponse, MoviesResponse},
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error};

use crate::{transport::ApiTransport, StoreEvent};

const NETWORK_ERROR_MESSAGE: &str = "Network error";
const MOVIES_ERROR_MESSAGE: &str = "Failed to load movies";
const MOVIE_ERROR_MESSAGE: &str = "Failed to load movie";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub movies: Vec<Movie>,
    /// `None` until a detail fetch returns a movie.
    pub current_movie: Option<Movie>,
    pub comments: Vec<Comment>,
    pub loading: bool,
    pub movie_loading: bool,
    pub comments_loading: bool,
    /// Last list/detail failure; empty when the last such fetch succeeded.
    pub error: String,
}

#[derive(Debug, Error)]
enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("unexpected payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl FetchError {
    fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(err) if err.has_response() => {
                err.server_message().unwrap_or(fallback).to_string()
            }
            Self::Api(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Payload(_) => fallback.to_string(),
        }
    }
}

pub struct CatalogStore {
    api: Arc<dyn ApiTransport>,
    state: Mutex<CatalogState>,
    events: broadcast::Sender<StoreEvent>,
}

impl CatalogStore {
    pub fn new(api: Arc<dyn ApiTransport>, events: broadcast::Sender<StoreEvent>) -> Self {
        Self {
            api,
            state: Mutex::new(CatalogState::default()),
            events,
        }
    }

    pub async fn state(&self) -> CatalogState {
        self.state.lock().await.clone()
    }

    pub async fn get_movies(&self) {
        self.update(|state| {
            state.loading = true;
            state.error.clear();
        })
        .await;

        let result = self
            .fetch::<MoviesResponse>(movies_route())
            .await
            .map(|payload| payload.movies.unwrap_or_default());

        self.update(|state| {
            match result {
                Ok(movies) => {
                    debug!(count = movies.len(), "catalog: movies loaded");
                    state.movies = movies;
                }
                Err(err) => {
                    error!(error = %err, "catalog: error fetching movies");
                    state.error = err.user_message(MOVIES_ERROR_MESSAGE);
                    state.movies = Vec::new();
                }
            }
            state.loading = false;
        })
        .await;
    }

    pub async fn get_movie_details(&self, id: &MovieId) {
        self.update(|state| {
            state.movie_loading = true;
            state.error.clear();
        })
        .await;

        let result = self.fetch_movie(id).await;

        self.update(|state| {
            match result {
                Ok(movie) => state.current_movie = movie,
                Err(err) => {
                    error!(movie_id = %id, error = %err, "catalog: error fetching movie");
                    state.error = err.user_message(MOVIE_ERROR_MESSAGE);
                    state.current_movie = None;
                }
            }
            state.movie_loading = false;
        })
        .await;
    }

    /// Comments are secondary: a failure empties them but never touches
    /// the shared `error` message.
    pub async fn get_comments(&self, movie_id: &MovieId) {
        self.update(|state| state.comments_loading = true).await;

        let result = self
            .fetch::<CommentsResponse>(&comments_route(movie_id))
            .await
            .map(|payload| payload.comments.unwrap_or_default());

        self.update(|state| {
            match result {
                Ok(comments) => state.comments = comments,
                Err(err) => {
                    error!(movie_id = %movie_id, error = %err, "catalog: error fetching comments");
                    state.comments = Vec::new();
                }
            }
            state.comments_loading = false;
        })
        .await;
    }

    async fn fetch<T>(&self, path: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Default,
    {
        let body = self.api.get(path, None).await?;
        if body.is_null() {
            return Ok(T::default());
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn fetch_movie(&self, id: &MovieId) -> Result<Option<Movie>, FetchError> {
        let body = self.api.get(&movie_route(id), None).await?;
        if is_empty_record(&body) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(body)?))
    }

    async fn update(&self, mutate: impl FnOnce(&mut CatalogState)) {
        let mut guard = self.state.lock().await;
        mutate(&mut *guard);
        let _ = self.events.send(StoreEvent::Catalog(guard.clone()));
    }
}

fn is_empty_record(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
