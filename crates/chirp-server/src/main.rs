mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use chirp_api::App;
use chirp_auth::{AuthConfig, AuthService, keys};
use chirp_db::{Database, queries, record, schema};

/// Chirp social-network server and admin tools.
#[derive(Parser)]
#[command(name = "chirp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the TCP server
    RunServer {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,
    },

    /// Create the database tables
    InitDb {
        /// Drop existing tables first
        #[arg(long)]
        force: bool,
    },

    /// Grant or revoke a user's admin role
    ModifyAdmins {
        #[arg(long)]
        username: String,

        /// Pass "admin" to grant the role, anything else to revoke it
        #[arg(long, default_value = "admin")]
        new_role: String,
    },

    /// Generate a fresh signing keypair, printed in env-var form
    GenKeys,
}

fn db_path() -> PathBuf {
    std::env::var("CHIRP_DB_PATH")
        .unwrap_or_else(|_| "chirp.db".into())
        .into()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::RunServer { host, port } => run_server(&host, port).await,
        Commands::InitDb { force } => init_db(force),
        Commands::ModifyAdmins { username, new_role } => modify_admins(&username, &new_role),
        Commands::GenKeys => gen_keys(),
    }
}

async fn run_server(host: &str, port: u16) -> Result<()> {
    let db = Database::open(&db_path())?;
    // Missing key material must stop the server here, not on the first
    // signin.
    let auth = AuthService::from_env(AuthConfig::default())?;
    let app = Arc::new(App::new(db, auth));

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Chirp server listening on {addr}");

    server::serve(listener, app).await
}

fn init_db(force: bool) -> Result<()> {
    let db = Database::open(&db_path())?;
    db.exclusive(|tx| schema::init(tx, force))
        .context("schema init failed (pass --force to recreate existing tables)")?;

    info!("Database initialized at {}", db_path().display());
    Ok(())
}

fn modify_admins(username: &str, new_role: &str) -> Result<()> {
    let is_admin = new_role == "admin";

    let db = Database::open(&db_path())?;
    db.exclusive(|tx| {
        let mut user = queries::user_by_name(tx, username)?;
        user.is_admin = is_admin;
        record::update(tx, &user)
    })
    .with_context(|| format!("failed to update role of {username}"))?;

    info!(
        "{} is {} an admin",
        username,
        if is_admin { "now" } else { "no longer" }
    );
    Ok(())
}

fn gen_keys() -> Result<()> {
    let (private_pem, public_pem) = keys::generate_keypair()?;

    println!(
        "{}={}",
        chirp_auth::PRIVATE_KEY_ENV,
        keys::pem_to_env(&private_pem)
    );
    println!(
        "{}={}",
        chirp_auth::PUBLIC_KEY_ENV,
        keys::pem_to_env(&public_pem)
    );
    Ok(())
}
