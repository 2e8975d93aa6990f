//! Server configuration

use clap::Parser;

/// Kars server configuration, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "kars", about = "Kars e-commerce backend", long_about = None)]
pub struct Config {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "8083")]
    pub port: u16,

    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value = "10")]
    pub database_max_connections: u32,

    /// NATS server for domain events; events are only logged when unset
    #[arg(long, env = "NATS_URL")]
    pub nats_url: Option<String>,
}

impl Config {
    /// Load `.env` (if present), then parse flags and environment.
    pub fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();
        Self::try_parse()
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
