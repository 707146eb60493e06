//! Access/refresh token persistence and JWT expiry checks.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::db::KeyValueStore;
use crate::errors::AppError;

pub const ACCESS_TOKEN_KEY: &str = "imtsb_access_token";
pub const REFRESH_TOKEN_KEY: &str = "imtsb_refresh_token";
/// Older clients kept the access token under this key.
pub const LEGACY_TOKEN_KEY: &str = "imtsb_api_token";

/// Token pair kept in the key-value store next to the session.
#[derive(Clone)]
pub struct TokenStore {
    kv: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn access_token(&self) -> Result<Option<String>, AppError> {
        if let Some(stored) = self.kv.get(ACCESS_TOKEN_KEY).await? {
            return Ok(Some(stored.value));
        }
        Ok(self.kv.get(LEGACY_TOKEN_KEY).await?.map(|s| s.value))
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, AppError> {
        Ok(self.kv.get(REFRESH_TOKEN_KEY).await?.map(|s| s.value))
    }

    /// Save whatever tokens a successful response carries: `accessToken`
    /// (or `token`) and an optional `refreshToken`.
    pub async fn store_from_response(&self, body: &Value) -> Result<(), AppError> {
        let access = body
            .get("accessToken")
            .or_else(|| body.get("token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        if let Some(access) = access {
            self.kv.put(ACCESS_TOKEN_KEY, access, None).await?;
            self.kv.put(LEGACY_TOKEN_KEY, access, None).await?;
        }

        let refresh = body
            .get("refreshToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        if let Some(refresh) = refresh {
            self.kv.put(REFRESH_TOKEN_KEY, refresh, None).await?;
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, LEGACY_TOKEN_KEY] {
            self.kv.remove(key).await?;
        }
        Ok(())
    }
}

/// Decode the payload segment of a JWT without checking its signature.
pub fn jwt_payload(token: &str) -> Option<Value> {
    let segment = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// True when `now` is within `skew` of the token's `exp` claim, or past it.
/// Tokens that cannot be decoded, or carry no `exp`, never expire here.
pub fn token_expires_within(token: &str, skew: Duration, now: DateTime<Utc>) -> bool {
    let Some(exp) = jwt_payload(token)
        .as_ref()
        .and_then(|p| p.get("exp"))
        .and_then(Value::as_i64)
        .filter(|exp| *exp > 0)
    else {
        return false;
    };
    now.timestamp() >= exp - skew.as_secs() as i64
}
