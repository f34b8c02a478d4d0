use anyhow::Context;
use clap::Args;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Connection settings for the hosted Postgres instance.
#[derive(Args, Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    /// Maximum pooled connections
    #[arg(long, env = "DASHBOARD_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let database_url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set to the dashboard's Postgres instance")?;

        debug!(max_connections = self.max_connections, "connecting to Postgres");
        PgPoolOptions::new()
            .max_connections(self.max_connections.max(1))
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")
    }
}

/// Logs go to stderr so command output on stdout stays pipeable.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
