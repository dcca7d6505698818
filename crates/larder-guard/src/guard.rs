//! Route guard — serve the dashboard only to sessions `/verify` vouches for.
//!
//! Any doubt sends the visitor to the login page: an unauthenticated answer,
//! an unreachable backend, or a response that cannot be decoded.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use larder_common::config::AuthConfig;

use crate::verify::{GuardError, VerifyClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send the visitor to this path with `302 Found`.
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct AuthGuard {
    verify: VerifyClient,
    login_path: String,
}

impl AuthGuard {
    pub fn new(verify: VerifyClient, login_path: impl Into<String>) -> Self {
        Self {
            verify,
            login_path: login_path.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, GuardError> {
        Ok(Self::new(
            VerifyClient::from_config(config)?,
            config.login_path.clone(),
        ))
    }

    pub async fn check(&self, cookie: Option<&str>) -> GuardDecision {
        match self.verify.verify(cookie).await {
            Ok(true) => GuardDecision::Allow,
            Ok(false) => {
                tracing::debug!("session not authenticated; redirecting to login");
                GuardDecision::Redirect(self.login_path.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, url = self.verify.verify_url(), "session verification failed");
                GuardDecision::Redirect(self.login_path.clone())
            }
        }
    }
}

/// Middleware for routes that require a logged-in session.
pub async fn require_session(
    State(guard): State<Arc<AuthGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let cookie = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match guard.check(cookie.as_deref()).await {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(location) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
    }
}

/// Put every route of `router` behind [`require_session`].
///
/// Keep the login page itself outside the protected router.
pub fn protect<S>(router: Router<S>, guard: Arc<AuthGuard>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(guard, require_session))
}
