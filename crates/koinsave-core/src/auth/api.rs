use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use super::decoder::{decode, DecodeError};
use super::session::{Clock, Session, SessionValidator, SystemClock, UserProfile};
use super::store::{StoreError, TokenStore};

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Received token is unusable: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to store token: {0}")]
    Store(#[from] StoreError),
}

/// Read and write side of the session for the rest of the application.
///
/// The sign-in flow calls `login` with the token it received; views call
/// `check_auth_status` to show who is signed in.
#[derive(Clone)]
pub struct AuthSession {
    store: Arc<dyn TokenStore>,
    validator: SessionValidator,
}

impl AuthSession {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        let validator = SessionValidator::with_clock(store.clone(), clock);
        Self { store, validator }
    }

    pub fn validator(&self) -> &SessionValidator {
        &self.validator
    }

    /// Persist `token` and derive the profile it carries.
    ///
    /// The token is written before it is decoded, so a decode failure leaves
    /// it in the store until the next evaluation evicts it. Expiry is not
    /// checked here.
    pub fn login(&self, token: &str) -> Result<UserProfile, LoginError> {
        self.store.set(token)?;

        match decode(token) {
            Ok(claims) => {
                let user = UserProfile::from_claims(&claims);
                info!(has_sub = user.id.is_some(), "Login successful");
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                Err(e.into())
            }
        }
    }

    /// Remove the stored token. Always succeeds from the caller's view.
    pub fn logout(&self) {
        match self.store.clear() {
            Ok(()) => info!("Logged out"),
            Err(e) => warn!(error = %e, "Failed to clear stored token on logout"),
        }
    }

    /// Current session, with the same eviction rules the route guard uses.
    pub fn check_auth_status(&self) -> Session {
        self.validator.evaluate()
    }
}

// ============================================================================
// Tests
// ============================================================================
