//! API endpoint discovery.
//!
//! The server may have fallen forward from its preferred port, so the client
//! probes a fixed candidate list until one answers `/health`.
//!
//!
//!
//! # Order
//! - The cached port, when it is one of the candidates
//! - Every other candidate in declared order, one at a time
//! - The default port, with a warning, when nothing answered
//!
//! Only a fresh discovery writes the cache. A cached port that still answers
//! is left as is.
use std::{fmt, sync::Arc};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    probe::Probe,
    storage::{API_LAST_PORT, Storage},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

pub struct EndpointResolver {
    host: String,
    candidates: Vec<u16>,
    default_port: u16,
    prober: Arc<dyn Probe>,
    storage: Arc<dyn Storage>,
    resolved: OnceCell<Endpoint>,
}

impl EndpointResolver {
    pub fn new(config: &ClientConfig, prober: Arc<dyn Probe>, storage: Arc<dyn Storage>) -> Self {
        Self {
            host: config.host.clone(),
            candidates: config.candidates.clone(),
            default_port: config.default_port,
            prober,
            storage,
            resolved: OnceCell::new(),
        }
    }

    /// Resolved endpoint, discovering it on first call.
    ///
    /// Concurrent callers share the same discovery run.
    pub async fn resolve(&self) -> Endpoint {
        self.resolved.get_or_init(|| self.discover()).await.clone()
    }

    pub fn resolved(&self) -> Option<&Endpoint> {
        self.resolved.get()
    }

    fn endpoint(&self, port: u16) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port,
        }
    }

    async fn cached_port(&self) -> Option<u16> {
        let raw = self.storage.get(API_LAST_PORT).await?;

        match raw.trim().parse::<u16>() {
            Ok(0) => None,
            Ok(port) if self.candidates.contains(&port) => Some(port),
            Ok(port) => {
                debug!("Cached port {port} is not a candidate, ignoring");
                None
            }
            Err(e) => {
                debug!("Cached port {raw:?} unreadable: {e}");
                None
            }
        }
    }

    async fn discover(&self) -> Endpoint {
        let cached = self.cached_port().await;

        if let Some(port) = cached {
            if self.prober.probe(port).await {
                info!("API reachable on cached port {port}");
                return self.endpoint(port);
            }

            debug!("Cached port {port} did not answer");
        }

        for &port in self.candidates.iter().filter(|&&port| Some(port) != cached) {
            if !self.prober.probe(port).await {
                continue;
            }

            info!("API discovered on port {port}");
            if let Err(e) = self.storage.set(API_LAST_PORT, &port.to_string()).await {
                warn!("Failed to remember port {port}: {e}");
            }

            return self.endpoint(port);
        }

        let fallback = self.endpoint(self.default_port);
        warn!(
            "API not reachable on any of {:?}, using default {fallback}",
            self.candidates
        );

        fallback
    }
}
