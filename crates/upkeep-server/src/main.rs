//! upkeep server: application entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use upkeep_auth::{AuthConfig, TenantContext};
use upkeep_db::{DbConfig, DbManager};

/// Multi-tenant asset and maintenance tracking backend.
#[derive(Parser, Debug)]
#[command(name = "upkeep-server", version, long_about = None)]
struct Cli {
    /// SurrealDB WebSocket address
    #[arg(long, env = "UPKEEP_DB_URL", default_value = "127.0.0.1:8000")]
    db_url: String,

    /// SurrealDB namespace
    #[arg(long, env = "UPKEEP_DB_NAMESPACE", default_value = "upkeep")]
    db_namespace: String,

    /// SurrealDB database
    #[arg(long, env = "UPKEEP_DB_DATABASE", default_value = "main")]
    db_database: String,

    /// SurrealDB root user
    #[arg(long, env = "UPKEEP_DB_USERNAME", default_value = "root")]
    db_username: String,

    /// SurrealDB root password
    #[arg(long, env = "UPKEEP_DB_PASSWORD", default_value = "root", hide_env_values = true)]
    db_password: String,

    /// PEM file with the Ed25519 private key used to sign access tokens
    #[arg(long, env = "UPKEEP_JWT_PRIVATE_KEY", value_name = "FILE")]
    jwt_private_key: Option<PathBuf>,

    /// PEM file with the Ed25519 public key used to verify access tokens
    #[arg(long, env = "UPKEEP_JWT_PUBLIC_KEY", value_name = "FILE")]
    jwt_public_key: Option<PathBuf>,

    /// Issuer written to and required in access tokens
    #[arg(long, env = "UPKEEP_JWT_ISSUER", default_value = "upkeep")]
    jwt_issuer: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "UPKEEP_TOKEN_LIFETIME_SECS", default_value_t = 900)]
    token_lifetime_secs: u64,

    /// Pepper prepended to passwords before hashing
    #[arg(long, env = "UPKEEP_PASSWORD_PEPPER", hide_env_values = true)]
    pepper: Option<String>,

    /// Log filter directives (e.g. `info,upkeep_db=debug`)
    #[arg(long, env = "UPKEEP_LOG", default_value = "info")]
    log: String,
}

impl Cli {
    fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }

    /// `None` when no key pair is configured.
    fn auth_config(&self) -> anyhow::Result<Option<AuthConfig>> {
        let (Some(private), Some(public)) = (&self.jwt_private_key, &self.jwt_public_key) else {
            return Ok(None);
        };

        let read = |path: &PathBuf| {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read key file {}", path.display()))
        };

        Ok(Some(AuthConfig {
            jwt_private_key_pem: read(private)?,
            jwt_public_key_pem: read(public)?,
            access_token_lifetime_secs: self.token_lifetime_secs,
            jwt_issuer: self.jwt_issuer.clone(),
            pepper: self.pepper.clone(),
        }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid log filter")?)
        .json()
        .init();

    info!("Starting upkeep server");

    match cli.auth_config()? {
        Some(auth) => {
            TenantContext::new(&auth).context("invalid JWT key material")?;
            info!(issuer = %auth.jwt_issuer, "Token verification configured");
        }
        None => info!("No JWT key pair configured; token verification is disabled"),
    }

    let db = DbManager::connect(&cli.db_config())
        .await
        .context("failed to connect to SurrealDB")?;
    db.migrate().await.context("schema migration failed")?;

    info!("upkeep server ready; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("upkeep server stopped");
    Ok(())
}
