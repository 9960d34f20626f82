//! Store trait and Redis implementation.
//!
//! Handlers only see [`RecordStore`], injected as `Arc<dyn RecordStore>`
//! through [`crate::AppState`]. The store's own connection handling and
//! per-key atomicity are treated as opaque; this layer adds no coordination
//! of its own.

use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, ClientTlsConfig, TlsCertificates};

use crate::config::StoreConfig;

/// Key-value store holding encoded client records.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Fetch the encoded record for `id`, if present.
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>>;

    /// Write the encoded record under `id`, overwriting blindly.
    async fn set(&self, id: &str, value: Vec<u8>) -> Result<()>;

    /// Whether `id` currently exists in the store.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Enumerate every key currently in the store. Best-effort: keys may
    /// vanish between enumeration and a later fetch.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Round-trip liveness probe.
    async fn ping(&self) -> Result<String>;
}

/// Redis-backed store over a mutually authenticated TLS connection.
#[derive(Clone)]
pub struct RedisStore {
    con: redis::aio::MultiplexedConnection,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish()
    }
}

impl RedisStore {
    /// Connect to the store described by `cfg`.
    ///
    /// The client certificate, key, and CA bundle are read from the
    /// configured paths; the server certificate is always verified.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self> {
        let client_cert = std::fs::read(&cfg.client_cert)
            .with_context(|| format!("reading client certificate {}", cfg.client_cert))?;
        let client_key = std::fs::read(&cfg.client_key)
            .with_context(|| format!("reading client key {}", cfg.client_key))?;
        let root_cert = std::fs::read(&cfg.ca_cert)
            .with_context(|| format!("reading CA certificate {}", cfg.ca_cert))?;

        let url = format!("rediss://{}:{}", cfg.host, cfg.port);
        let client = Client::build_with_tls(
            url.as_str(),
            TlsCertificates {
                client_tls: Some(ClientTlsConfig {
                    client_cert,
                    client_key,
                }),
                root_cert: Some(root_cert),
            },
        )
        .context("building store client")?;

        let con = client
            .get_multiplexed_async_connection()
            .await
            .with_context(|| format!("connecting to store at {url}"))?;

        Ok(Self { con })
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let mut con = self.con.clone();
        let data: Option<Vec<u8>> = con.get(id).await?;
        Ok(data)
    }

    async fn set(&self, id: &str, value: Vec<u8>) -> Result<()> {
        let mut con = self.con.clone();
        let _: () = con.set(id, value).await?;
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let mut con = self.con.clone();
        let found: bool = con.exists(id).await?;
        Ok(found)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut con = self.con.clone();
        let keys: Vec<String> = con.keys("*").await?;
        Ok(keys)
    }

    async fn ping(&self) -> Result<String> {
        let mut con = self.con.clone();
        let pong: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(pong)
    }
}
