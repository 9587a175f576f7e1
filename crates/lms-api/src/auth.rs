//! # Authentication Middleware
//!
//! Resolves the caller's [`Principal`] from the bearer credential.
//!
//! ## Credential Format
//!
//! ```text
//! Bearer {email}:{secret}   — secret checked against LMS_AUTH_SECRET
//! Bearer {email}            — accepted only when no secret is configured
//! ```
//!
//! A missing, malformed or wrong credential never fails the request. The
//! caller is simply anonymous, and each operation decides whether anonymous
//! access is allowed (published course metadata is, everything else is not).

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use lms_core::{Email, Principal};
use subtle::ConstantTimeEq;

// ── Actor ───────────────────────────────────────────────────────────────────

/// The caller of an operation: an authenticated principal, or anonymous.
///
/// Passed explicitly into every service call. Handlers extract it via the
/// `FromRequestParts` impl, which never rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor(pub Option<Principal>);

impl Actor {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn from_email(email: Email) -> Self {
        Self(Some(Principal::new(email)))
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Actor>().cloned().unwrap_or_default())
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the secret to prevent credential leakage in logs.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Credential Validation ───────────────────────────────────────────────────

/// Constant-time comparison of secrets.
///
/// When lengths differ, performs a dummy comparison so that timing does not
/// reveal the expected length.
fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer credential into a principal.
///
/// With a configured secret the credential must be `{email}:{secret}`.
/// Without one, the whole credential is taken as the e-mail.
pub fn parse_credential(token: &str, secret: Option<&str>) -> Result<Principal, String> {
    let email = match secret {
        Some(expected) => {
            let (email, provided) = token
                .rsplit_once(':')
                .ok_or_else(|| "credential must be {email}:{secret}".to_string())?;
            if !constant_time_eq(provided, expected) {
                return Err("invalid credential secret".into());
            }
            email
        }
        None => token,
    };
    let email = Email::parse(email).map_err(|e| e.to_string())?;
    Ok(Principal::new(email))
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Resolve the [`Actor`] from the `Authorization` header and inject it into
/// request extensions. Requests without a valid credential continue as
/// anonymous.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let actor = match request.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => {
            match parse_credential(bearer.token(), config.secret.as_deref()) {
                Ok(principal) => Actor(Some(principal)),
                Err(reason) => {
                    tracing::debug!(%reason, "ignoring invalid bearer credential");
                    Actor::anonymous()
                }
            }
        }
        None => Actor::anonymous(),
    };

    request.extensions_mut().insert(actor);
    next.run(request).await
}
