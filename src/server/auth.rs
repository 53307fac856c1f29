//! HTTP Basic authentication for the management API.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::warn;

use super::response::ApiError;
use super::state::AppState;

/// User name assumed when the credential is a bare password
pub const DEFAULT_USER: &str = "podhost";

/// Realm announced in `WWW-Authenticate`
pub const REALM: &str = "auth";

/// The single user allowed to call the API
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    user: String,
    password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Parse `user:password`, or a bare password for the default user
    pub fn parse(raw: &str) -> Self {
        let (user, password) = raw.split_once(':').unwrap_or((DEFAULT_USER, raw));
        Self {
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Check an `Authorization` header value
    pub fn verify(&self, authorization: &str) -> bool {
        let Some((scheme, encoded)) = authorization.split_once(' ') else {
            return false;
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            return false;
        }

        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };

        match decoded.split_once(':') {
            Some((user, password)) => user == self.user && password == self.password,
            None => false,
        }
    }
}

/// Value of the `WWW-Authenticate` header sent with a 401
pub fn challenge() -> String {
    format!("Basic realm=\"{}\"", REALM)
}

/// Reject API requests without valid credentials (no-op when auth is disabled)
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(credential) = state.credential() {
        let accepted = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| credential.verify(v))
            .unwrap_or(false);

        if !accepted {
            warn!(uri = %request.uri(), "Rejected request without valid credentials");
            return Err(ApiError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}
