//! Per-run HTTP session shared by every probe
//!
//! A [`Session`] owns one pooled `reqwest::Client`. Probes never hold the
//! session itself, only a [`SessionLease`]; the session counts live leases so
//! that closing it can prove every probe has released its handle.

use crate::error::{AppError, Result};
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Configuration for the session's connection pool
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of idle connections per host
    pub max_idle_per_host: usize,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Idle pooled connections are dropped after this long
    pub keep_alive_timeout: Option<Duration>,
    /// TCP keep-alive settings
    pub tcp_keep_alive: Option<Duration>,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 4,
            connect_timeout: Duration::from_secs(5),
            keep_alive_timeout: Some(Duration::from_secs(30)),
            tcp_keep_alive: Some(Duration::from_secs(60)),
            user_agent: format!("{}/{}", crate::PKG_NAME, crate::VERSION),
        }
    }
}

/// Shared HTTP client for the lifetime of one run
#[derive(Debug)]
pub struct Session {
    id: String,
    client: Client,
    opened_at: Instant,
    leases: Arc<AtomicUsize>,
}

impl Session {
    /// Open a session with a freshly built client
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(config.user_agent.clone());

        if let Some(keep_alive) = config.tcp_keep_alive {
            builder = builder.tcp_keepalive(keep_alive);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client,
            opened_at: Instant::now(),
            leases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hand out a counted handle to the client
    pub fn lease(&self) -> SessionLease {
        self.leases.fetch_add(1, Ordering::SeqCst);
        SessionLease {
            client: self.client.clone(),
            leases: Arc::clone(&self.leases),
        }
    }

    pub fn outstanding_leases(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    /// Tear the session down; consuming `self` makes a second close impossible
    pub fn close(self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            lifetime: self.opened_at.elapsed(),
            outstanding_leases: self.leases.load(Ordering::SeqCst),
        }
    }
}

/// A probe's handle on the session client
#[derive(Debug)]
pub struct SessionLease {
    client: Client,
    leases: Arc<AtomicUsize>,
}

impl SessionLease {
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.leases.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What a closed session reports about itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(rename = "lifetime_ms", serialize_with = "crate::types::serialize_millis")]
    pub lifetime: Duration,
    /// Leases still alive at close; zero on every clean exit path
    pub outstanding_leases: usize,
}
