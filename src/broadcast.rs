use std::sync::Arc;

use tracing::{debug, warn};

use crate::registry::Registry;
use crate::types::ConnectionId;

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Hand `message` to every admitted connection except `exclude`.
///
/// `exclude = None` reaches everyone. Each recipient's writer task owns
/// its socket, so a message lands as one write and a slow or dead peer
/// never holds up the caller. Failures are logged and counted, never
/// returned.
pub async fn broadcast(
    registry: &Registry,
    message: &str,
    exclude: Option<ConnectionId>,
) -> BroadcastReport {
    let message: Arc<str> = Arc::from(message);
    let mut report = BroadcastReport::default();

    for recipient in registry.snapshot().await {
        if Some(recipient.id) == exclude {
            continue;
        }
        match recipient.outbox.send(Arc::clone(&message)) {
            Ok(()) => report.delivered += 1,
            Err(_) => {
                warn!(
                    id = %recipient.id,
                    nickname = %recipient.nickname,
                    "recipient writer is gone; message dropped"
                );
                report.failed += 1;
            }
        }
    }

    debug!(
        delivered = report.delivered,
        failed = report.failed,
        "broadcast complete"
    );
    report
}
