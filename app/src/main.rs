use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use api::{ApiConfig, AppState};
use database::Database;
use user::{Mailer, MailerConfig, TokenConfig};

mod logging;

/// Folio - content cataloguing and review API server
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "FOLIO_PORT", default_value_t = 3030)]
    port: u16,

    /// Path to the SQLite database file
    #[arg(long, env = "FOLIO_DATABASE", default_value = "data/folio.db")]
    database: String,

    /// Directory for rolling log files
    #[arg(long, env = "FOLIO_LOG_DIR", default_value = "data/logs")]
    log_dir: PathBuf,
}

fn mailer_from_env() -> MailerConfig {
    let defaults = MailerConfig::default();
    MailerConfig {
        smtp_host: std::env::var("FOLIO_SMTP_HOST").unwrap_or(defaults.smtp_host),
        smtp_port: std::env::var("FOLIO_SMTP_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.smtp_port),
        smtp_username: std::env::var("FOLIO_SMTP_USERNAME").unwrap_or(defaults.smtp_username),
        smtp_password: std::env::var("FOLIO_SMTP_PASSWORD").unwrap_or(defaults.smtp_password),
        from_email: std::env::var("FOLIO_FROM_EMAIL").unwrap_or(defaults.from_email),
        from_name: std::env::var("FOLIO_FROM_NAME").unwrap_or(defaults.from_name),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _guard = logging::init_logging(&cli.log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let tokens = match std::env::var("FOLIO_TOKEN_SECRET") {
        Ok(secret) => TokenConfig::new(secret),
        Err(_) => {
            warn!("FOLIO_TOKEN_SECRET is not set; using an insecure development secret");
            TokenConfig::new("folio-dev-secret")
        }
    };

    let db = Arc::new(Database::new(&cli.database).await?);
    let mailer = Mailer::new(mailer_from_env());

    let state = AppState { db, tokens, mailer };
    let config = ApiConfig::new().with_port(cli.port);

    api::start_server(state, config)
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {e}"))?;

    Ok(())
}
