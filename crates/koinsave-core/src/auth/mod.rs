//! Session authentication.
//!
//! This module provides:
//! - `TokenStore`: persistence of the single bearer token under `TOKEN_KEY`
//! - `decode`: unverified parsing of a compact token into `Claims`
//! - `SessionValidator`: derives a `Session` and evicts invalid tokens
//! - `AuthSession`: `login`/`logout`/`check_auth_status` for collaborators
//!
//! The token's signature is never checked. Only shape and expiry are.

pub mod api;
pub mod decoder;
pub mod session;
pub mod store;

pub use api::{AuthSession, LoginError};
pub use decoder::{decode, Claims, DecodeError};
pub use session::{
    Clock, ExpiredTokenError, Session, SessionValidator, SystemClock, TokenError, UserProfile,
};
pub use store::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, StoreError, TokenStore, TOKEN_KEY,
};
