//! Nickname negotiation, run once per accepted connection before it is
//! admitted.
//!
//! The peer sends a candidate; the hub answers with the rejection notice
//! and waits for another, or with the welcome message once the candidate
//! is registered. Empty and over-long candidates get the same rejection
//! as a duplicate. There is no retry limit: nothing is reserved until the
//! registry accepts the name.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::connection::{Admitted, Connection, Negotiating};
use crate::error::ChatError;
use crate::message::{REJECTION_NOTICE, SERVER_FULL_NOTICE};
use crate::registry::Registry;

/// Trim a raw candidate, returning `None` if it cannot be a nickname.
pub fn normalize(candidate: &str, max_len: usize) -> Option<&str> {
    let name = candidate.trim();
    if name.is_empty() || name.chars().count() > max_len {
        return None;
    }
    Some(name)
}

/// Run negotiation to completion.
///
/// `Ok(None)` means the peer hung up before a nickname was accepted; no
/// registry entry exists in that case. A full registry yields
/// `CapacityExceeded` after the peer has been told and the socket closed.
pub async fn negotiate(
    mut conn: Connection<Negotiating>,
    registry: &Registry,
    welcome: &str,
    max_len: usize,
) -> Result<Option<Connection<Admitted>>, ChatError> {
    loop {
        let Some(candidate) = conn.read_message().await? else {
            debug!(id = %conn.id, "peer left during negotiation");
            return Ok(None);
        };

        let Some(nickname) = normalize(&candidate, max_len) else {
            conn.send(REJECTION_NOTICE).await?;
            continue;
        };
        let nickname = nickname.to_string();

        let (outbox, inbox) = mpsc::unbounded_channel();
        match registry.admit(conn.id, &nickname, outbox).await {
            Ok(()) => {}
            Err(ChatError::NicknameTaken(_)) => {
                debug!(id = %conn.id, %nickname, "nickname taken");
                conn.send(REJECTION_NOTICE).await?;
                continue;
            }
            Err(error @ ChatError::CapacityExceeded { .. }) => {
                // Best effort; the peer is refused either way.
                let _ = conn.send(SERVER_FULL_NOTICE).await;
                conn.refuse().await;
                return Err(error);
            }
            Err(error) => return Err(error),
        }

        // Broadcasts that arrive from here on wait in `inbox` until the
        // writer task starts, so the welcome is always the first message.
        if let Err(error) = conn.send(welcome).await {
            registry.remove(conn.id).await;
            return Err(error.into());
        }

        info!(id = %conn.id, peer = ?conn.addr, %nickname, "admitted");
        return Ok(Some(conn.admit(nickname, inbox)));
    }
}
