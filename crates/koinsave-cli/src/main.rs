//! KoinSave CLI - sign in, inspect and gate the locally stored session.
//!
//! The token lives in the configured store (a local-storage style file by
//! default), so every invocation sees the session left by the previous one.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use koinsave_core::api::{ApiClient, FlowKind, SignInForm, SignUpForm};
use koinsave_core::auth::decode;
use koinsave_core::guard::return_destination;
use koinsave_core::{
    AuthSession, Config, GuardState, Location, Render, Route, RouteGuard, TokenStore,
    UserProfile,
};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable naming an additional log file
const ENV_LOG_FILE: &str = "KOINSAVE_LOG_FILE";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(ENV_LOG_FILE) {
        Ok(path) if !path.trim().is_empty() => {
            let path = Path::new(&path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "koinsave.log".into());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn print_usage() {
    println!("Usage: koinsave <command> [args]");
    println!();
    println!("Commands:");
    println!("  signin [email]   Sign in and store the session token");
    println!("  signup           Create an account");
    println!("  login <token>    Store a token obtained elsewhere");
    println!("  logout           Remove the stored token");
    println!("  status           Show the current session as JSON");
    println!("  open <path>      Visit a page, e.g. /dashboard");
    println!("  help             Show this message");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing();

    let config = Config::load()?;
    let auth = AuthSession::new(config.open_store()?);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("signin") => {
            let destination = sign_in(&config, &auth, args.get(1).cloned(), None).await?;
            open(&config, &auth, &destination).await
        }
        Some("signup") => sign_up(&config).await,
        Some("login") => login(&auth, args.get(1).cloned()),
        Some("logout") => {
            auth.logout();
            println!("Signed out.");
            Ok(())
        }
        Some("status") => status(&auth),
        Some("open") => open(&config, &auth, args.get(1).map(String::as_str).unwrap_or("/")).await,
        Some("help") | Some("--help") | Some("-h") | None => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            print_usage();
            Err(anyhow::anyhow!("Unknown command: {}", other))
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [Y/n]: ", question))?;
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y"))
}

fn report_form_errors<E: std::fmt::Display>(errors: &[E]) {
    for e in errors {
        eprintln!("  - {}", e);
    }
}

// ============================================================================
// Sign-in / Sign-up
// ============================================================================

/// Exchange credentials for a token, store it, and return where to go next.
async fn sign_in(
    config: &Config,
    auth: &AuthSession,
    email: Option<String>,
    from: Option<&Location>,
) -> Result<String> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    let form = SignInForm::new(email, password);
    if let Err(errors) = form.validate() {
        report_form_errors(&errors);
        bail!("Please fix the sign-in form");
    }

    let api = ApiClient::new(config.api_base_url.as_str())?;
    println!("Signing in...");

    let token = match api.sign_in(&form).await {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Sign-in request failed");
            bail!(e.user_message(FlowKind::SignIn));
        }
    };

    let user = auth
        .login(&token)
        .context("The server returned a token that cannot be used")?;
    info!("Signed in");
    println!("Welcome back, {}!", user.first_name);

    Ok(return_destination(from, &config.default_landing_path))
}

async fn sign_up(config: &Config) -> Result<()> {
    let form = SignUpForm {
        first_name: prompt("First name: ")?,
        last_name: prompt("Last name: ")?,
        email: prompt("Email: ")?,
        phone: prompt("Phone (digits only): ")?,
        password: rpassword::prompt_password("Password: ")?,
        confirm_password: rpassword::prompt_password("Confirm password: ")?,
    };
    if let Err(errors) = form.validate() {
        report_form_errors(&errors);
        bail!("Please fix the sign-up form");
    }

    let api = ApiClient::new(config.api_base_url.as_str())?;
    println!("Creating account...");

    if let Err(e) = api.sign_up(&form).await {
        error!(error = %e, "Sign-up request failed");
        bail!(e.user_message(FlowKind::SignUp));
    }

    println!("Account created. Sign in with: koinsave signin {}", form.email);
    Ok(())
}

fn login(auth: &AuthSession, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => prompt("Token: ")?,
    };

    let user = auth
        .login(&token)
        .context("Could not log in with this token")?;
    print_profile(&user);
    Ok(())
}

fn status(auth: &AuthSession) -> Result<()> {
    let session = auth.check_auth_status();
    println!("{}", serde_json::to_string_pretty(&session)?);

    if session.is_authenticated {
        let expires_at = auth
            .validator()
            .store()
            .get()
            .ok()
            .flatten()
            .and_then(|token| decode(&token).ok())
            .and_then(|claims| claims.expires_at());
        if let Some(at) = expires_at {
            eprintln!(
                "Session expires {} ({} minutes left)",
                at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                (at - Utc::now()).num_minutes().max(0)
            );
        }
    }
    Ok(())
}

// ============================================================================
// Pages
// ============================================================================

/// Visit `href`, going through the route guard for protected pages.
async fn open(config: &Config, auth: &AuthSession, href: &str) -> Result<()> {
    let guard = RouteGuard::with_sign_in_path(auth.validator().clone(), config.sign_in_path.as_str());
    let mut location = Location::parse(href);

    loop {
        let route = Route::resolve(&location.pathname);
        if !route.is_protected() {
            render_public(route);
            return Ok(());
        }

        let mut activation = guard.activate(location.clone());
        if let Render::Placeholder(message) = activation.render(&()) {
            eprintln!("{}", message);
        }
        activation.settle().await;

        let redirect = match activation.render(&()) {
            Render::Content(_) => {
                if let GuardState::Authenticated(user) = activation.state() {
                    render_dashboard(user);
                }
                return Ok(());
            }
            Render::Redirect(redirect) => redirect,
            Render::Placeholder(_) => return Ok(()),
        };

        println!("{} requires sign-in.", redirect.from.href());
        if !confirm("Sign in now?")? {
            println!("Redirected to {}.", redirect.to);
            return Ok(());
        }

        let destination = sign_in(config, auth, None, Some(&redirect.from)).await?;
        location = Location::parse(&destination);
    }
}

fn render_public(route: Route) {
    println!("== {} ==", route.title());
    match route {
        Route::Landing => {
            println!("Save smarter with KoinSave.");
            println!("Sign in: koinsave signin    New here? koinsave signup");
        }
        Route::SignIn => println!("Run: koinsave signin [email]"),
        Route::SignUp => println!("Run: koinsave signup"),
        Route::NotFound => {
            println!("The page you're looking for doesn't exist or may have been moved.");
            println!("Go to Home: koinsave open /    Sign in: koinsave signin");
        }
        Route::Dashboard => {}
    }
}

fn render_dashboard(user: &UserProfile) {
    println!("== {} ==", Route::Dashboard.title());
    println!("Welcome, {}!", user.full_name());
    print_profile(user);
}

fn print_profile(user: &UserProfile) {
    println!("  Name:    {}", user.full_name());
    if let Some(ref email) = user.email {
        println!("  Email:   {}", email);
    }
    if let Some(ref account) = user.account_number {
        println!("  Account: {}", account);
    }
    if let Some(ref id) = user.id {
        println!("  ID:      {}", id);
    }
}
