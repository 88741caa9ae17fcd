use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::OAuthError;

/// Credential issued by the token endpoint.
///
/// The layout mirrors what Google's client libraries write to `token.json`,
/// so an existing token file can be reused. Fields this crate does not know
/// about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token for API requests
    pub access_token: String,
    /// Refresh token, only returned when offline access was granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space separated scopes granted by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Expiry time as Unix timestamp in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Raw body of a successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Credential {
    /// Build a credential from a token endpoint response body.
    ///
    /// `expires_in` (seconds) is converted to an absolute `expiry_date`
    /// relative to `now_ms`.
    pub fn from_token_response(body: &str, now_ms: i64) -> Result<Self, OAuthError> {
        let response: TokenResponse = serde_json::from_str(body)
            .map_err(|e| OAuthError::InvalidResponse(e.to_string()))?;

        if response.access_token.is_empty() {
            return Err(OAuthError::InvalidResponse(
                "empty access_token in token response".to_string(),
            ));
        }

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            scope: response.scope,
            token_type: response.token_type.unwrap_or_else(default_token_type),
            id_token: response.id_token,
            expiry_date: response
                .expires_in
                .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000))),
            extra: response.extra,
        })
    }

    /// Check if the token is expired or will expire soon (within 60 seconds).
    ///
    /// A credential without an expiry is never considered expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => now_ms + 60_000 >= expiry,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
