//! Who is logged in: the bearer token, its display claims and the profile
//! fetched from the backend.

use std::sync::Arc;

use serde_json::json;
use shared::{
    domain::UserProfile,
    error::ApiError,
    protocol::{
        login_route, user_details_route, LoginRequest, LoginResponse, UserDetailsResponse,
        LOGIN_SUCCESS_MESSAGE,
    },
};
use storage::TokenStore;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use crate::{token::decode_claims, transport::ApiTransport, StoreEvent};

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please contact administrator";

/// HTTP statuses whose error payload message is shown to the user verbatim.
const CLIENT_ERROR_STATUSES: [u16; 3] = [400, 401, 404];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub mobile_no: Option<String>,
    pub is_loading: bool,
}

impl SessionState {
    /// Session as it looks right after startup: the raw token plus whatever
    /// claims could be decoded from it. A malformed token keeps the token but
    /// leaves the claims unset.
    pub fn from_token(token: Option<String>) -> Self {
        let Some(token) = token else {
            return Self::default();
        };

        let mut state = Self {
            token: Some(token),
            ..Self::default()
        };
        state.apply_claims();
        state
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn apply_claims(&mut self) {
        let Some(token) = self.token.as_deref() else {
            return;
        };
        match decode_claims(token) {
            Ok(claims) => {
                self.email = claims.email;
                self.is_admin = Some(claims.is_admin);
            }
            Err(err) => {
                error!(error = %err, "session: invalid token format");
                self.email = None;
                self.is_admin = None;
            }
        }
    }

    fn apply_profile(&mut self, profile: UserProfile) {
        self.is_admin = profile.is_admin;
        self.first_name = profile.first_name;
        self.last_name = profile.last_name;
        self.mobile_no = profile.mobile_no;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    Failure { message: String },
}

impl LoginOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure { message } => Some(message),
        }
    }
}

pub struct SessionStore {
    api: Arc<dyn ApiTransport>,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<StoreEvent>,
}

impl SessionStore {
    pub async fn new(
        api: Arc<dyn ApiTransport>,
        tokens: Arc<dyn TokenStore>,
        events: broadcast::Sender<StoreEvent>,
    ) -> Self {
        let token = match tokens.load_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "session: failed to read persisted token");
                None
            }
        };

        Self {
            api,
            tokens,
            state: Mutex::new(SessionState::from_token(token)),
            events,
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Exchanges credentials for a token. Every failure is folded into
    /// [`LoginOutcome::Failure`]; nothing is returned as an error.
    pub async fn login(&self, email: &str, password: &str) -> LoginOutcome {
        let request = json!(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });

        let body = match self.api.post(login_route(), &request).await {
            Ok(body) => body,
            Err(err) => return login_failure_from_error(&err),
        };

        let response: LoginResponse = match serde_json::from_value(body) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "session: unexpected login response body");
                return LoginOutcome::failure(LOGIN_FAILED_MESSAGE);
            }
        };

        if response.message.as_deref() != Some(LOGIN_SUCCESS_MESSAGE) {
            info!("session: login rejected by backend");
            return LoginOutcome::failure(
                response
                    .message
                    .unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string()),
            );
        }

        let Some(token) = response.access.filter(|token| !token.is_empty()) else {
            warn!("session: login succeeded without an access token");
            return LoginOutcome::failure(LOGIN_FAILED_MESSAGE);
        };

        if let Err(err) = self.tokens.save_token(&token).await {
            error!(error = %err, "session: failed to persist token");
        }

        {
            let mut guard = self.state.lock().await;
            guard.token = Some(token.clone());
            guard.apply_claims();
            self.publish(&guard);
        }
        info!("session: logged in");

        self.get_user_details(Some(&token)).await;
        LoginOutcome::Success
    }

    /// Refreshes the profile with `token`, or resets the whole session when
    /// `token` is `None`.
    ///
    /// The token is only adopted once the backend accepts it. A failed
    /// refresh only clears the loading flag: token and profile stay as they
    /// were.
    pub async fn get_user_details(&self, token: Option<&str>) {
        let Some(token) = token else {
            let mut guard = self.state.lock().await;
            *guard = SessionState::default();
            self.publish(&guard);
            return;
        };

        {
            let mut guard = self.state.lock().await;
            guard.is_loading = true;
            self.publish(&guard);
        }

        let profile = match self.api.get(user_details_route(), Some(token)).await {
            Ok(body) => match serde_json::from_value::<UserDetailsResponse>(body) {
                Ok(details) => Some(details.user),
                Err(err) => {
                    error!(error = %err, "session: malformed user details response");
                    None
                }
            },
            Err(err) => {
                error!(error = %err, "session: failed to fetch user details");
                None
            }
        };

        let mut guard = self.state.lock().await;
        if let Some(profile) = profile {
            // a reset that landed while the request was in flight is overwritten
            guard.token = Some(token.to_string());
            guard.apply_profile(profile);
        }
        guard.is_loading = false;
        self.publish(&guard);
    }

    /// Forgets the persisted token and resets the session.
    pub async fn logout(&self) {
        if let Err(err) = self.tokens.clear_token().await {
            error!(error = %err, "session: failed to clear persisted token");
        }
        self.get_user_details(None).await;
        info!("session: logged out");
    }

    fn publish(&self, state: &SessionState) {
        let _ = self.events.send(StoreEvent::Session(state.clone()));
    }
}

fn login_failure_from_error(err: &ApiError) -> LoginOutcome {
    match err.status() {
        Some(status) if CLIENT_ERROR_STATUSES.contains(&status) => {
            info!(status, "session: login refused");
            LoginOutcome::failure(err.server_message().unwrap_or(LOGIN_FAILED_MESSAGE))
        }
        _ => {
            warn!(error = %err, "session: login request failed");
            LoginOutcome::failure(LOGIN_FAILED_MESSAGE)
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
