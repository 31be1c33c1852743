//! Route table for the client application.

/// Where unauthenticated visitors of a protected route are sent.
pub const SIGN_IN_PATH: &str = "/signin";

/// Where a successful sign-in lands when no return location was carried.
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

/// Known views of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    SignIn,
    SignUp,
    Dashboard,
    NotFound,
}

impl Route {
    /// Resolve a pathname. Matching ignores ASCII case and a trailing slash.
    pub fn resolve(pathname: &str) -> Self {
        let trimmed = pathname.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };

        [Route::Landing, Route::SignIn, Route::SignUp, Route::Dashboard]
            .into_iter()
            .find(|route| route.path().eq_ignore_ascii_case(normalized))
            .unwrap_or(Route::NotFound)
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::SignIn => SIGN_IN_PATH,
            Route::SignUp => "/signup",
            Route::Dashboard => DEFAULT_LANDING_PATH,
            Route::NotFound => "*",
        }
    }

    /// Only protected routes go through the route guard
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Landing => "KoinSave",
            Route::SignIn => "Sign In to KoinSave",
            Route::SignUp => "Create your KoinSave account",
            Route::Dashboard => "Dashboard",
            Route::NotFound => "404 - Page not found",
        }
    }
}
