//! Core library for KoinSave.
//!
//! Gates protected parts of the client on a locally stored bearer token and
//! derives a lightweight user profile from its claims, without contacting a
//! server.
//!
//! - `auth`: token storage, decoding, session validation, login/logout
//! - `guard`: the route guard state machine and the route table
//! - `api`: the sign-in/sign-up HTTP collaborator and its form validation
//! - `config`: configuration loading and store selection
//!
//! Tokens are decoded WITHOUT signature verification. A session derived here
//! is only good enough for UI gating; it must never back an authorization
//! decision that matters beyond what is rendered locally.

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;

pub use auth::{
    AuthSession, Claims, Clock, DecodeError, ExpiredTokenError, FileTokenStore,
    KeyringTokenStore, LoginError, MemoryTokenStore, Session, SessionValidator, StoreError,
    SystemClock, TokenStore, UserProfile, TOKEN_KEY,
};
pub use config::{Config, StoreBackend};
pub use guard::{GuardActivation, GuardState, Location, Redirect, Render, Route, RouteGuard};

#[cfg(test)]
pub(crate) mod test_support {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::auth::Clock;

    /// Mint an unsigned compact token carrying `claims` as its payload.
    pub fn token_with_claims(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    /// Fixed instant used across tests: 2025-01-01T00:00:00Z.
    pub const NOW: i64 = 1_735_689_600;

    pub struct FixedClock(pub DateTime<Utc>);

    impl FixedClock {
        pub fn at(secs: i64) -> Self {
            Self(Utc.timestamp_opt(secs, 0).single().unwrap())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }
}
