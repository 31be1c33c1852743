//! HTTP collaborator for the sign-in and sign-up flows.
//!
//! The server exchanges credentials for a bearer token; this module only
//! carries the request and response. Everything the token is used for
//! afterwards lives in `crate::auth`.

pub mod client;
pub mod error;
pub mod forms;

pub use client::ApiClient;
pub use error::{ApiError, FlowKind};
pub use forms::{FormError, SignInForm, SignUpForm};
