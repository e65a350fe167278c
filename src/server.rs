use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::broadcast::{BroadcastReport, broadcast};
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::ChatError;
use crate::message::{ChatLine, Notice, SERVER_FULL_NOTICE};
use crate::nickname::negotiate;
use crate::registry::Registry;
use crate::session::run_session;
use crate::terminal::Console;
use crate::types::IdAllocator;

/// Shared state of the hub: the registry, the operator's console and the
/// configuration. Workers hold it through an `Arc`.
pub struct Hub {
    registry: Registry,
    console: Arc<dyn Console>,
    config: ServerConfig,
    ids: IdAllocator,
}

impl Hub {
    pub fn new(config: ServerConfig, console: Arc<dyn Console>) -> Self {
        Self {
            registry: Registry::with_reserved(config.max_clients, [config.nickname.clone()]),
            console,
            config,
            ids: IdAllocator::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Broadcast a line typed by the hub operator to every peer.
    pub async fn say(&self, body: &str) -> BroadcastReport {
        let line = ChatLine::new(self.config.nickname.as_str(), body).to_string();
        broadcast(&self.registry, &line, None).await
    }

    /// Worker for one accepted connection: capacity check, negotiation,
    /// join notice, receive loop. Nothing here escapes to the caller.
    pub async fn handle_connection(&self, stream: TcpStream) {
        let id = self.ids.next_id();
        let mut conn = Connection::new(id, stream);
        let peer = conn.addr;

        if self.registry.is_full().await {
            info!(%id, ?peer, "refused: registry full");
            if let Err(error) = conn.send(SERVER_FULL_NOTICE).await {
                debug!(%id, ?error, "could not deliver refusal");
            }
            conn.refuse().await;
            self.console.alert(&format!("Refused connection from {}: server full", display_addr(peer)));
            return;
        }

        let admitted = match negotiate(
            conn,
            &self.registry,
            &self.config.welcome,
            self.config.max_nickname_len,
        )
        .await
        {
            Ok(Some(admitted)) => admitted,
            Ok(None) => return,
            Err(ChatError::CapacityExceeded { capacity }) => {
                info!(%id, ?peer, capacity, "refused: registry filled during negotiation");
                self.console.alert(&format!("Refused connection from {}: server full", display_addr(peer)));
                return;
            }
            Err(error) => {
                warn!(%id, ?peer, ?error, "negotiation failed");
                return;
            }
        };

        let notice = Notice::Joined(admitted.nickname().to_string()).to_string();
        broadcast(&self.registry, &notice, Some(id)).await;
        self.console.notice(&notice);

        run_session(admitted, &self.registry, self.console.as_ref()).await;
    }
}

fn display_addr(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.to_string())
        .unwrap_or_else(|| "unknown peer".to_string())
}

/// Accept loop. One worker task per connection, reaped as it finishes.
pub struct Server {
    listener: TcpListener,
    hub: Arc<Hub>,
}

impl Server {
    pub fn new(listener: TcpListener, hub: Arc<Hub>) -> Self {
        Self { listener, hub }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until `shutdown` resolves, then abort all workers.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ChatError>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, hub } = self;
        let mut workers = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!(active = workers.len(), "hub shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted");
                        let hub = Arc::clone(&hub);
                        workers.spawn(async move { hub.handle_connection(stream).await });
                    }
                    Err(error) => warn!(?error, "failed to accept connection"),
                },
                Some(finished) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(join_error) = finished {
                        if join_error.is_panic() {
                            error!(error = ?join_error, "connection worker panicked");
                        }
                    }
                }
            }
        }

        workers.shutdown().await;
        Ok(())
    }
}
