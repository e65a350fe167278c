use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ChatError;
use crate::server::Hub;
use crate::terminal::{Console, Edit};

/// Operator input loop on the hub: every submitted line goes to all
/// peers as `[nickname]: line`. `/who` lists the admitted peers locally.
/// Returns when the operator quits or the terminal goes away.
pub async fn run_operator(
    hub: &Hub,
    console: &dyn Console,
    edits: &mut mpsc::UnboundedReceiver<Edit>,
) -> Result<(), ChatError> {
    while let Some(edit) = edits.recv().await {
        match edit {
            Edit::Continue => {}
            Edit::Submit(line) if line.trim() == "/who" => {
                let names = hub.registry().nicknames().await;
                let listing = if names.is_empty() {
                    "No one else is here.".to_string()
                } else {
                    format!("Online: {}", names.join(", "))
                };
                console.notice(&listing);
            }
            Edit::Submit(line) => {
                let report = hub.say(&line).await;
                debug!(delivered = report.delivered, failed = report.failed, "operator message sent");
            }
            Edit::Quit => break,
        }
    }

    Ok(())
}
