use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::connection::{Admitted, Connection};
use crate::message::{ChatLine, Notice, strip_line_ending};
use crate::registry::Registry;
use crate::terminal::Console;

/// Receive loop of one admitted connection.
///
/// Every message read is prefixed with the sender's nickname, relayed to
/// everyone else and shown on the hub console. End of stream or a read
/// error ends the session: the entry is removed first, so nothing else is
/// queued for this peer and its nickname is free before others hear that
/// it left. Errors stay inside this function.
pub async fn run_session(mut conn: Connection<Admitted>, registry: &Registry, console: &dyn Console) {
    let id = conn.id;
    let nickname = conn.nickname().to_string();

    loop {
        match conn.read_message().await {
            Ok(Some(raw)) => {
                let body = strip_line_ending(&raw);
                if body.trim().is_empty() {
                    continue;
                }
                let line = ChatLine::new(nickname.as_str(), body).to_string();
                broadcast(registry, &line, Some(id)).await;
                console.message(&line);
            }
            Ok(None) => {
                debug!(%id, %nickname, "peer closed the connection");
                break;
            }
            Err(error) => {
                warn!(%id, %nickname, ?error, "read failed");
                console.alert(&format!("Connection to {nickname} failed: {error}"));
                break;
            }
        }
    }

    registry.remove(id).await;
    let notice = Notice::Left(nickname.clone()).to_string();
    broadcast(registry, &notice, None).await;
    console.alert(&notice);
    info!(%id, %nickname, peer = ?conn.addr, "disconnected");

    // The writer task exits on its own once the last queued message is out.
    drop(conn.close());
}
