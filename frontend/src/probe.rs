use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CACHE_CONTROL};
use tracing::debug;

pub const HEALTH_PATH: &str = "/health";

/// Liveness check for a single candidate port.
///
/// Implementations never fail, an unreachable port is simply `false`.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, port: u16) -> bool;
}

pub struct HttpProber {
    client: Client,
    host: String,
}

impl HttpProber {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            host: host.into(),
        })
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, port: u16) -> bool {
        let url = format!("http://{}:{port}{HEALTH_PATH}", self.host);

        match self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
        {
            Ok(response) => {
                debug!("Probe {url} => {}", response.status());
                response.status().is_success()
            }
            Err(e) => {
                debug!("Probe {url} failed: {e}");
                false
            }
        }
    }
}
