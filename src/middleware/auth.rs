//! Bearer-session resolution
//!
//! Sessions are issued by the external auth service; this module only asks it
//! who a token belongs to. Handlers receive the result as an explicit
//! [`CallerId`] through the [`AuthenticatedCaller`] extractor.

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult, AuthError};
use crate::middleware::error::{app_error_response, get_request_id_from_headers};

/// Authenticated user id, passed into every core operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves a bearer token to a user. `Ok(None)` means the token is unknown
/// or expired.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn resolve(&self, token: &str) -> AppResult<Option<CallerId>>;
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Asks the auth service's `/user` endpoint who owns a token.
pub struct HttpSessionVerifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSessionVerifier {
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| AppError::configuration(format!("auth client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SessionVerifier for HttpSessionVerifier {
    async fn resolve(&self, token: &str) -> AppResult<Option<CallerId>> {
        let response = self
            .client
            .get(format!("{}/user", self.base_url))
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Auth service unreachable");
                AppError::auth(AuthError::InvalidToken)
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(status = %status.as_u16(), "Auth service rejected session lookup");
            return Ok(None);
        }

        let user: AuthUser = response.json().await.map_err(|e| {
            warn!(error = %e, "Auth service returned an unreadable user");
            AppError::auth(AuthError::InvalidToken)
        })?;

        Ok(Some(CallerId::new(user.id)))
    }
}

/// Fixed token table for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionVerifier {
    sessions: HashMap<String, CallerId>,
}

impl StaticSessionVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.sessions.insert(token.into(), CallerId::new(user_id));
        self
    }
}

#[async_trait]
impl SessionVerifier for StaticSessionVerifier {
    async fn resolve(&self, token: &str) -> AppResult<Option<CallerId>> {
        Ok(self.sessions.get(token).cloned())
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor that rejects the request unless the bearer token resolves.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub CallerId);

impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    S: Send + Sync,
    Arc<dyn SessionVerifier>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = get_request_id_from_headers(&parts.headers);

        let Some(token) = bearer_token(parts) else {
            return Err(app_error_response(
                AppError::auth(AuthError::MissingToken),
                request_id,
            ));
        };

        let verifier = Arc::<dyn SessionVerifier>::from_ref(state);
        match verifier.resolve(token).await {
            Ok(Some(caller)) => {
                debug!(caller = %caller, "Session resolved");
                Ok(AuthenticatedCaller(caller))
            }
            Ok(None) => Err(app_error_response(
                AppError::auth(AuthError::InvalidToken),
                request_id,
            )),
            Err(err) => Err(app_error_response(err, request_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[derive(Clone)]
    struct State {
        sessions: Arc<dyn SessionVerifier>,
    }

    impl FromRef<State> for Arc<dyn SessionVerifier> {
        fn from_ref(state: &State) -> Self {
            state.sessions.clone()
        }
    }

    fn state() -> State {
        State {
            sessions: Arc::new(StaticSessionVerifier::new().with_session("tok-c1", "C1")),
        }
    }

    async fn extract(auth: Option<&str>) -> Result<AuthenticatedCaller, AppError> {
        let mut builder = Request::builder().uri("/api/payments/verify");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthenticatedCaller::from_request_parts(&mut parts, &state()).await
    }

    #[tokio::test]
    async fn known_token_resolves_to_caller() {
        let AuthenticatedCaller(caller) = extract(Some("Bearer tok-c1")).await.unwrap();
        assert_eq!(caller.as_str(), "C1");
    }

    #[tokio::test]
    async fn missing_or_unknown_token_is_unauthorized() {
        let missing = extract(None).await.unwrap_err();
        assert_eq!(missing.status_code(), 401);

        let unknown = extract(Some("Bearer nope")).await.unwrap_err();
        assert_eq!(unknown.status_code(), 401);

        let wrong_scheme = extract(Some("Basic tok-c1")).await.unwrap_err();
        assert_eq!(wrong_scheme.status_code(), 401);
    }
}
