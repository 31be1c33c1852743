//! Route guard for protected views.
//!
//! Each activation of a protected view spawns one deferred session
//! evaluation bound to the activation's lifetime:
//!
//! ```text
//! Loading ──evaluate()──► Authenticated(user)   renders the content
//!                    └──► Unauthenticated       redirects to sign-in
//! ```
//!
//! The settled state is final for that activation. Dropping an activation
//! before its evaluation completes aborts the task and discards the result.

pub mod routes;

pub use routes::{Route, DEFAULT_LANDING_PATH, SIGN_IN_PATH};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auth::{Session, SessionValidator, UserProfile};

/// Placeholder shown while the session is being verified.
pub const LOADING_MESSAGE: &str = "Verifying authentication...";

/// A requested location: pathname plus optional query string and fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    /// Split `href` into pathname, `?query` and `#fragment`.
    pub fn parse(href: &str) -> Self {
        let href = href.trim();
        let (rest, hash) = match href.find('#') {
            Some(idx) => (&href[..idx], &href[idx..]),
            None => (href, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };

        Self {
            pathname: pathname.to_string(),
            search: search.to_string(),
            hash: hash.to_string(),
        }
    }

    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// Redirect issued for an unauthenticated visit.
///
/// `from` carries the originally requested location so the sign-in flow
/// can send the caller back after success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    pub from: Location,
    /// Replace the current history entry instead of pushing one
    pub replace: bool,
}

impl Redirect {
    pub fn return_to(&self) -> &str {
        &self.from.pathname
    }
}

/// Where to go after a successful sign-in.
pub fn return_destination(from: Option<&Location>, default: &str) -> String {
    from.map(|location| location.pathname.as_str())
        .filter(|pathname| !pathname.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Route guard states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Authenticated(UserProfile),
    Unauthenticated,
}

impl GuardState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, GuardState::Loading)
    }

    fn from_session(session: Session) -> Self {
        match session {
            Session {
                is_authenticated: true,
                user: Some(user),
            } => GuardState::Authenticated(user),
            _ => GuardState::Unauthenticated,
        }
    }
}

/// What a guarded view should render.
#[derive(Debug, PartialEq, Eq)]
pub enum Render<'a, T: ?Sized> {
    Placeholder(&'static str),
    Content(&'a T),
    Redirect(Redirect),
}

/// Decides whether a protected view renders or redirects.
#[derive(Clone)]
pub struct RouteGuard {
    validator: SessionValidator,
    sign_in_path: String,
}

impl RouteGuard {
    pub fn new(validator: SessionValidator) -> Self {
        Self::with_sign_in_path(validator, SIGN_IN_PATH)
    }

    pub fn with_sign_in_path(validator: SessionValidator, sign_in_path: impl Into<String>) -> Self {
        Self {
            validator,
            sign_in_path: sign_in_path.into(),
        }
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    /// Activate the guard for `location`.
    ///
    /// Must be called within a Tokio runtime. Evaluation runs exactly once,
    /// after the activation has been handed back to the caller.
    pub fn activate(&self, location: Location) -> GuardActivation {
        let (tx, rx) = oneshot::channel();
        let validator = self.validator.clone();
        let path = location.pathname.clone();

        let task = tokio::spawn(async move {
            // Defer past the caller's current step, like an effect after mount
            tokio::task::yield_now().await;

            // Store reads may hit the disk or the keychain
            let session = match tokio::task::spawn_blocking(move || validator.evaluate()).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(path = %path, error = %e, "Session evaluation task failed");
                    return;
                }
            };
            if tx.send(session).is_err() {
                debug!(path = %path, "Guard deactivated, discarding session result");
            }
        });

        debug!(path = %location.pathname, "Guard activated");

        GuardActivation {
            location,
            sign_in_path: self.sign_in_path.clone(),
            state: GuardState::Loading,
            result_rx: Some(rx),
            task,
        }
    }
}

/// One activation of a guarded view. Dropping it cancels a pending
/// evaluation.
pub struct GuardActivation {
    location: Location,
    sign_in_path: String,
    state: GuardState,
    result_rx: Option<oneshot::Receiver<Session>>,
    task: JoinHandle<()>,
}

impl GuardActivation {
    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Apply the evaluation result if it has arrived, without waiting.
    pub fn poll(&mut self) -> &GuardState {
        if let Some(mut rx) = self.result_rx.take() {
            match rx.try_recv() {
                Ok(session) => self.transition(GuardState::from_session(session)),
                Err(TryRecvError::Empty) => self.result_rx = Some(rx),
                Err(TryRecvError::Closed) => self.evaluation_lost(),
            }
        }
        &self.state
    }

    /// Wait for the evaluation and apply it.
    pub async fn settle(&mut self) -> &GuardState {
        if let Some(rx) = self.result_rx.take() {
            match rx.await {
                Ok(session) => self.transition(GuardState::from_session(session)),
                Err(_) => self.evaluation_lost(),
            }
        }
        &self.state
    }

    pub fn render<'a, T: ?Sized>(&self, content: &'a T) -> Render<'a, T> {
        match self.state {
            GuardState::Loading => Render::Placeholder(LOADING_MESSAGE),
            GuardState::Authenticated(_) => Render::Content(content),
            GuardState::Unauthenticated => Render::Redirect(Redirect {
                to: self.sign_in_path.clone(),
                from: self.location.clone(),
                replace: true,
            }),
        }
    }

    fn transition(&mut self, next: GuardState) {
        debug!(
            path = %self.location.pathname,
            authenticated = matches!(next, GuardState::Authenticated(_)),
            "Guard settled"
        );
        self.state = next;
    }

    fn evaluation_lost(&mut self) {
        warn!(path = %self.location.pathname, "Session evaluation ended without a result");
        self.transition(GuardState::Unauthenticated);
    }
}

impl Drop for GuardActivation {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
