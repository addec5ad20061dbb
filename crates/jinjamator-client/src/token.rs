//! Bearer token bookkeeping.
//!
//! The server hands out JWTs. Their claims are read without verifying the
//! signature: the token was received directly from the server, and the
//! client only needs `exp`/`iat` to schedule renewal.

use crate::error::{ClientError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;
use std::fmt;

/// Body of `/aaa/login/local` and `/aaa/token` responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenPayload {
    pub access_token: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
}

/// Where a token stands relative to its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Less than half of the lifetime remains.
    RenewalDue,
    Expired,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TokenState {
    bearer: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    pub fn new(bearer: String, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            bearer,
            issued_at,
            expires_at,
        }
    }

    /// Build from a raw token, reading `exp` and `iat` from its claims.
    /// A token without `iat` is treated as issued now.
    pub fn from_jwt(bearer: impl Into<String>) -> Result<Self> {
        let bearer = bearer.into();
        let claims = decode_claims(&bearer)?;
        let expires_at = timestamp(claims.exp)?;
        let issued_at = match claims.iat {
            Some(iat) => timestamp(iat)?,
            None => Utc::now(),
        };
        Ok(Self::new(bearer, issued_at, expires_at))
    }

    /// Prefer the explicit expiry fields of a login/renewal body and fall
    /// back to the token claims when they are missing.
    pub(crate) fn from_payload(payload: &TokenPayload) -> Result<Self> {
        match (payload.expires_at, payload.expires_in) {
            (Some(expires_at), Some(expires_in)) => {
                let expires_at = timestamp(expires_at)?;
                let issued_at = expires_at - TimeDelta::seconds(expires_in);
                Ok(Self::new(payload.access_token.clone(), issued_at, expires_at))
            }
            _ => Self::from_jwt(payload.access_token.clone()),
        }
    }

    pub fn bearer(&self) -> &str {
        &self.bearer
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn ttl(&self) -> TimeDelta {
        self.expires_at - self.issued_at
    }

    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        let remaining = self.expires_at - now;
        if remaining <= TimeDelta::zero() {
            Freshness::Expired
        } else if remaining < self.ttl() / 2 {
            Freshness::RenewalDue
        } else {
            Freshness::Fresh
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.freshness(now) == Freshness::Expired
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("bearer", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn decode_claims(bearer: &str) -> Result<Claims> {
    let raw = bearer
        .strip_prefix("Bearer ")
        .or_else(|| bearer.strip_prefix("bearer "))
        .unwrap_or(bearer)
        .trim();

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<Claims>(raw, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ClientError::Token(format!("timestamp {} out of range", secs)))
}
