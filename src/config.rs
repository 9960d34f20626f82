use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Store host
    #[arg(long, env = "REDIS_HOST")]
    pub redis_host: Option<String>,

    /// Store port
    #[arg(long, env = "REDIS_PORT")]
    pub redis_port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Connection parameters for the external key-value store.
///
/// The TLS material lives at fixed paths in the deployment image; the paths
/// are configurable so tests can point elsewhere.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub client_cert: String,
    pub client_key: String,
    pub ca_cert: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // Defaults
        builder = builder
            .set_default("server.port", 4996)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("store.host", "redis")?
            .set_default("store.port", 6379)?
            .set_default("store.client_cert", "/tls/client.crt")?
            .set_default("store.client_key", "/tls/client.key")?
            .set_default("store.ca_cert", "/tls/redis-ca.crt")?;

        // Optional config file
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }

        // Environment variables prefixed with SCOREBOOK_
        // E.g. SCOREBOOK_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("SCOREBOOK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Legacy direct env vars used by the deployment (the clap `env`
        // attributes above already pick these up when running as a CLI,
        // but load_from_args is also called with synthetic argv in tests).
        if let Ok(val) = env::var("REDIS_HOST") {
            builder = builder.set_override("store.host", val)?;
        }
        if let Ok(val) = env::var("REDIS_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                builder = builder.set_override("store.port", port)?;
            }
        }

        // CLI overrides win over everything else
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.redis_host {
            builder = builder.set_override("store.host", host)?;
        }
        if let Some(port) = cli.redis_port {
            builder = builder.set_override("store.port", port)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
