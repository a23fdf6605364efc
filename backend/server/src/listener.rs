//! # Listener Bring-Up
//!
//! Binds the HTTP listener, falling forward to the next port while the
//! preferred one is taken.
//!
//! ```text
//! Unbound -> Binding -> Bound
//!               |  ^
//!               v  |
//!            Retrying
//!               |
//!               v
//!             Failed
//! ```
//!
//! - `max_attempts` is the fallback budget, the preferred port does not count
//! - Only address-in-use is retried, any other bind error fails at once
//! - `Bound` and `Failed` are terminal for a single `start` call
use std::io::ErrorKind;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::BindError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Unbound,
    Binding { port: u16 },
    /// Next port to try and the budget left after it.
    Retrying { port: u16, remaining: u32 },
    Bound { port: u16 },
    Failed { port: u16 },
}

pub struct ListenerBringUp {
    host: String,
    state: ListenerState,
    transitions: Vec<ListenerState>,
}

impl ListenerBringUp {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: ListenerState::Unbound,
            transitions: vec![ListenerState::Unbound],
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Every state visited so far, starting with `Unbound`.
    pub fn transitions(&self) -> &[ListenerState] {
        &self.transitions
    }

    fn transition(&mut self, next: ListenerState) {
        debug!("Listener {:?} -> {:?}", self.state, next);

        self.state = next;
        self.transitions.push(next);
    }

    pub async fn start(
        &mut self,
        preferred_port: u16,
        max_attempts: u32,
    ) -> Result<TcpListener, BindError> {
        let mut port = preferred_port;
        let mut remaining = max_attempts;

        loop {
            self.transition(ListenerState::Binding { port });

            let address = format!("{}:{port}", self.host);
            info!("Binding to {address}");

            let source = match TcpListener::bind(&address).await {
                Ok(listener) => {
                    self.transition(ListenerState::Bound { port });
                    info!("Server running on {address}");

                    return Ok(listener);
                }
                Err(e) if e.kind() != ErrorKind::AddrInUse => {
                    self.transition(ListenerState::Failed { port });
                    error!("Server failed to start: {e}");

                    return Err(BindError::Io { port, source: e });
                }
                Err(e) => e,
            };

            let next = match port.checked_add(1) {
                Some(next) if remaining > 0 => next,
                _ => {
                    self.transition(ListenerState::Failed { port });
                    error!("All fallback attempts failed. Last tried port: {port}");

                    return Err(BindError::PortsExhausted {
                        last_port: port,
                        source,
                    });
                }
            };

            remaining -= 1;
            warn!("Port {port} in use. Retrying on {next} ({remaining} tries left)...");

            self.transition(ListenerState::Retrying {
                port: next,
                remaining,
            });
            port = next;
        }
    }
}
