//! cafespot - search cafes and manage favorites from the terminal.
//!
//! Credentials live in the OS keychain between runs. Expired access tokens
//! are refreshed transparently; when the session cannot be recovered the
//! user is told to sign in again.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cafespot_core::models::{Cafe, CafeList};
use cafespot_core::utils::{format_optional, truncate, yes_no};
use cafespot_core::{
    ApiClient, Config, CredentialStore, HttpTransport, KeyringStore, MemoryStore, SessionClient,
    SessionEvent,
};

/// Column width for cafe names in list output
const NAME_WIDTH: usize = 32;

/// Column width for addresses in list output
const ADDRESS_WIDTH: usize = 40;

#[derive(Parser)]
#[command(name = "cafespot", version, about = "Find cafes and keep track of your favorites")]
struct Cli {
    /// Also write logs to a daily file under the cache directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Keep credentials in memory only; nothing touches the keychain
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Backend base URL (overrides config and CAFESPOT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        /// Defaults to the last email used
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check whether the stored session is still accepted
    Status,
    /// Search cafes by name or description
    Search { query: String },
    /// Most searched places
    Top,
    /// List your favorite cafes
    Favorites,
    /// Add or remove a favorite
    Toggle { place_id: String },
    /// Check whether places are favorites
    Check {
        #[arg(required = true)]
        place_ids: Vec<String>,
    },
    /// Change your password
    Passwd,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file on drop and must outlive the command.
fn init_tracing(log_file: bool) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    if !log_file {
        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(filter)
            .init();
        return Ok(None);
    }

    let logs_dir = Config::log_dir()?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "cafespot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .init();
    Ok(Some(guard))
}

/// Print a hint whenever the session ends and the user has to sign in again.
/// Finishes once the session client is dropped.
fn spawn_login_prompt(session: &SessionClient) -> JoinHandle<()> {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::NavigateToLogin) => {
                    eprintln!("Your session has expired. Run `cafespot login` to sign in again.");
                }
                Ok(event) => debug!(?event, "Session event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Missed session events"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file)?;

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }
    config.validate()?;

    let transport = HttpTransport::new(config.api_base_url.clone(), config.request_timeout())?;
    info!(api = %transport.base_url(), "cafespot starting");

    let store: Arc<dyn CredentialStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        if !KeyringStore::is_persistent() {
            warn!("No persistent keychain on this platform, you will need to sign in on every run");
        }
        Arc::new(KeyringStore::new(config.keyring_service.clone()))
    };
    let session = Arc::new(SessionClient::new(Arc::new(transport), store));
    let prompt = spawn_login_prompt(&session);
    let api = ApiClient::new(session);

    let result = run(cli.command, &api, &mut config).await;

    // Dropping the last session handle closes the event channel
    drop(api);
    let _ = prompt.await;

    result
}

async fn run(command: Command, api: &ApiClient, config: &mut Config) -> Result<()> {
    let session = api.session();

    match command {
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_line("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let credentials = session.login(&email, &password).await?;
            remember_email(config, &email);
            println!(
                "Signed in as {}",
                format_optional(credentials.display_name.as_deref(), &email)
            );
        }
        Command::Register { email, name } => {
            let password = prompt_new_password("Password: ")?;
            let credentials = session.register(name.as_deref(), &email, &password).await?;
            remember_email(config, &email);
            println!(
                "Account created. Signed in as {}",
                format_optional(credentials.display_name.as_deref(), &email)
            );
        }
        Command::Logout => {
            session.logout(false).await;
            println!("Signed out");
        }
        Command::Whoami => {
            let profile = api.profile().await?;
            match profile.email() {
                Some(email) => println!("{} <{}>", profile.name(), email),
                None => println!("{} (offline, from last sign-in)", profile.name()),
            }
        }
        Command::Status => {
            if session.is_authenticated().await {
                let name = session.display_name().await;
                println!("Signed in as {}", format_optional(name.as_deref(), "unknown user"));
            } else {
                println!("Not signed in");
            }
        }
        Command::Search { query } => print_cafes(&api.search_cafes(&query).await?),
        Command::Top => print_cafes(&api.top_places().await?),
        Command::Favorites => print_cafes(&api.favorites().await?),
        Command::Toggle { place_id } => {
            if api.toggle_favorite(&place_id).await? {
                println!("Added {} to favorites", place_id);
            } else {
                println!("Removed {} from favorites", place_id);
            }
        }
        Command::Check { place_ids } => {
            let checks = place_ids.iter().map(|id| api.is_favorite(id));
            let results = futures::future::join_all(checks).await;
            for (id, result) in place_ids.iter().zip(results) {
                match result {
                    Ok(favorite) => println!("{:<24} {}", id, yes_no(Some(favorite))),
                    Err(e) => println!("{:<24} error: {}", id, e),
                }
            }
        }
        Command::Passwd => {
            let current = rpassword::prompt_password("Current password: ")?;
            let new = prompt_new_password("New password: ")?;
            let message = api.change_password(&current, &new).await?;
            println!("{}", message);
        }
    }

    Ok(())
}

fn remember_email(config: &mut Config, email: &str) {
    if config.last_email.as_deref() == Some(email) {
        return;
    }
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        debug!(error = %e, "Failed to save last email");
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("No input given");
    }
    Ok(line)
}

fn prompt_new_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(label)?;
    let confirm = rpassword::prompt_password("Repeat password: ")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}

fn print_cafes(list: &CafeList) {
    if list.cafes.is_empty() {
        println!("No cafes found");
        return;
    }
    for cafe in &list.cafes {
        println!("{}", cafe_line(cafe));
    }
    println!("\n{} result(s)", list.total);
}

fn cafe_line(cafe: &Cafe) -> String {
    let status = if !cafe.is_operational() {
        "permanently closed"
    } else {
        match cafe.is_open_now() {
            Some(true) => "open",
            Some(false) => "closed",
            None => "",
        }
    };
    format!(
        "{:<12} {:<name_w$} {:>4} {:<8} {:<addr_w$} {:<18} {}",
        cafe.id,
        truncate(&cafe.name, NAME_WIDTH),
        cafe.rating_display(),
        cafe.price_display().unwrap_or_default(),
        truncate(cafe.address.as_deref().unwrap_or("-"), ADDRESS_WIDTH),
        status,
        cafe.meals().join(", "),
        name_w = NAME_WIDTH,
        addr_w = ADDRESS_WIDTH,
    )
}
