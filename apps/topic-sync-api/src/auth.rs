//! Bearer token authentication.
//!
//! Caller tokens are HS256 JWTs. The middleware verifies the token, then
//! inserts [`CallerClaims`] and the raw [`CallerToken`] into the request
//! extensions. The raw token is forwarded to the roster owner, which makes
//! the actual access decision.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use topic_sync::MemberId;

use crate::error::ApiError;
use crate::state::AppState;

/// Clock skew tolerance for `exp`, in seconds.
const LEEWAY_SECS: u64 = 60;

/// `userId` claim; issuers emit it as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserIdClaim {
    Number(u64),
    Text(String),
}

/// Claims read from a caller token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerClaims {
    #[serde(rename = "userId")]
    pub user_id: UserIdClaim,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl CallerClaims {
    /// The caller as a roster member, if `userId` is a positive integer.
    #[must_use]
    pub fn member_id(&self) -> Option<MemberId> {
        let raw = match &self.user_id {
            UserIdClaim::Number(n) => *n,
            UserIdClaim::Text(s) => s.trim().parse().ok()?,
        };
        MemberId::new(raw)
    }
}

/// The verbatim `Authorization` header of an authenticated request.
#[derive(Debug, Clone)]
pub struct CallerToken(pub String);

/// Verifies HS256 caller tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(secret: &[u8], issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        validation.algorithms = vec![Algorithm::HS256];
        validation.validate_aud = false;
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Decode and validate a raw token.
    pub fn verify(&self, token: &str) -> Result<CallerClaims, ApiError> {
        decode::<CallerClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::InvalidToken(format!("Invalid token: {e}")))
    }
}

/// Extract the token from a `Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware rejecting requests without a valid bearer token (403).
pub async fn require_jwt(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidToken("No token provided.".to_string()))?
        .to_string();

    let token = bearer_token(&header)
        .ok_or_else(|| ApiError::InvalidToken("Invalid token.".to_string()))?;

    let claims = state.verifier.verify(token).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected caller token");
    })?;

    tracing::debug!(user_id = ?claims.user_id, "Caller authenticated");

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(CallerToken(header));
    Ok(next.run(request).await)
}
