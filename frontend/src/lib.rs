//! Client for the user record API.
//!
//! The server falls forward to the next free port when its preferred one is
//! taken, so the client never assumes where it lives. Every record call first
//! waits on a single endpoint discovery run.
//!
//!
//!
//! # Discovery
//! - Probe `/health` on the last port that worked, if it is still a candidate
//! - Otherwise probe the candidate list in order and remember the first port that answers
//! - If nothing answers, use the default port and let individual calls fail
//!
//!
//!
//! # Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `API_HOST` | `localhost` |
//! | `API_PORT_CANDIDATES` | `8000,8001,8002,8003,8004` |
//! | `API_PROBE_TIMEOUT_MS` | `1500` |
//!
//! The last good port and the last edited record id are kept in
//! `<config dir>/user-records/storage.json`.
use std::sync::Arc;

use reqwest::Client;

pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod probe;
pub mod resolver;
pub mod storage;

use client::RecordClient;
use config::ClientConfig;
use probe::HttpProber;
use resolver::EndpointResolver;
use storage::Storage;

/// Wires an HTTP prober and a record client around one shared resolver.
pub fn connect(
    config: &ClientConfig,
    storage: Arc<dyn Storage>,
) -> Result<RecordClient, reqwest::Error> {
    let prober = HttpProber::new(config.host.clone(), config.probe_timeout)?;
    let resolver = EndpointResolver::new(config, Arc::new(prober), storage);

    Ok(RecordClient::new(Client::new(), Arc::new(resolver)))
}
