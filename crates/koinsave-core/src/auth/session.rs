use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::decoder::{decode, Claims, DecodeError};
use super::store::{StoreError, TokenStore};

/// First name shown when the token carries no usable `name` claim.
const FALLBACK_FIRST_NAME: &str = "User";

/// Source of the current instant. Injected so expiry is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpiredTokenError {
    #[error("Token has no numeric exp claim")]
    MissingExpiry,

    #[error("Token expired at {exp} (now {now})")]
    Expired { exp: f64, now: f64 },
}

/// Why a stored token was rejected. Both kinds lead to eviction.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Expired(#[from] ExpiredTokenError),
}

/// Profile derived from token claims. Recomputed on every evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl UserProfile {
    /// Build a profile, splitting `name` on its first space.
    pub fn from_claims(claims: &Claims) -> Self {
        let name = claims.name.as_deref().unwrap_or_default();
        let (first, last) = name.split_once(' ').unwrap_or((name, ""));

        Self {
            first_name: if first.is_empty() {
                FALLBACK_FIRST_NAME.to_string()
            } else {
                first.to_string()
            },
            last_name: last.to_string(),
            email: claims.email.clone(),
            account_number: claims.account_number.clone(),
            id: claims.sub.clone(),
        }
    }

    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// Derived authentication status. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            user: None,
        }
    }

    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
        }
    }
}

/// Check that `claims` carries a numeric `exp` strictly after `now`.
pub fn check_expiry(claims: &Claims, now: DateTime<Utc>) -> Result<(), ExpiredTokenError> {
    let exp = claims.exp.ok_or(ExpiredTokenError::MissingExpiry)?;
    let now = now.timestamp_millis() as f64 / 1000.0;
    if exp > now {
        Ok(())
    } else {
        Err(ExpiredTokenError::Expired { exp, now })
    }
}

/// Derives a `Session` from the token store, evicting invalid tokens.
#[derive(Clone)]
pub struct SessionValidator {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl SessionValidator {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Decode `token` and check its expiry against the clock.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode(token)?;
        check_expiry(&claims, self.clock.now())?;
        Ok(claims)
    }

    /// Evaluate the stored token.
    ///
    /// Never fails: decode and expiry problems, or a store holding unreadable
    /// data, evict the token and yield an unauthenticated session. A token that is absent short-circuits
    /// without touching the store.
    pub fn evaluate(&self) -> Session {
        let token = match self.store.get() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored token");
                return Session::unauthenticated();
            }
            Err(e @ StoreError::Corrupt(_)) => {
                warn!(error = %e, "Stored token is unreadable, evicting");
                self.evict();
                return Session::unauthenticated();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                return Session::unauthenticated();
            }
        };

        match self.validate(&token) {
            Ok(claims) => {
                debug!(has_sub = claims.sub.is_some(), "Stored token is valid");
                Session::authenticated(UserProfile::from_claims(&claims))
            }
            Err(reason) => {
                warn!(%reason, "Evicting invalid token");
                self.evict();
                Session::unauthenticated()
            }
        }
    }

    fn evict(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to evict invalid token");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
