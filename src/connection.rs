use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::{MessageReader, MessageWriter};
use crate::types::ConnectionId;

/// Accepted, nickname not confirmed yet. Not in the registry; the hub
/// writes its negotiation replies straight to the socket.
pub struct Negotiating {
    writer: MessageWriter,
}

/// Registered under a unique nickname. The socket's write half belongs to
/// the writer task draining this connection's outbox.
pub struct Admitted {
    nickname: String,
    writer_task: JoinHandle<()>,
}

/// One accepted TCP session. `S` is the lifecycle stage and carries the
/// data that only exists in that stage; dropping the value closes it.
pub struct Connection<S> {
    pub id: ConnectionId,
    pub addr: Option<SocketAddr>,
    reader: MessageReader,
    state: S,
}

impl<S> Connection<S> {
    pub async fn read_message(&mut self) -> std::io::Result<Option<String>> {
        self.reader.read_message().await
    }
}

impl Connection<Negotiating> {
    pub fn new(id: ConnectionId, stream: TcpStream) -> Self {
        let addr = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        Self::from_parts(id, addr, reader, writer)
    }

    /// Build a connection from any pair of stream halves.
    pub fn from_parts<R, W>(id: ConnectionId, addr: Option<SocketAddr>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            addr,
            reader: MessageReader::new(reader),
            state: Negotiating {
                writer: MessageWriter::new(writer),
            },
        }
    }

    /// Move to `Admitted`. The writer goes to a task draining `outbox`;
    /// anything queued before this call is written first.
    pub(crate) fn admit(
        self,
        nickname: String,
        outbox: mpsc::UnboundedReceiver<Arc<str>>,
    ) -> Connection<Admitted> {
        let writer_task = tokio::spawn(drain_outbox(self.id, self.state.writer, outbox));

        Connection {
            id: self.id,
            addr: self.addr,
            reader: self.reader,
            state: Admitted {
                nickname,
                writer_task,
            },
        }
    }

    /// Write directly to the peer. Only negotiation replies go this way;
    /// after admission everything passes through the outbox.
    pub async fn send(&mut self, message: &str) -> std::io::Result<()> {
        self.state.writer.send(message).await
    }

    /// Close a connection that was never admitted.
    pub async fn refuse(mut self) {
        if let Err(error) = self.state.writer.shutdown().await {
            debug!(id = %self.id, ?error, "shutdown of refused connection failed");
        }
    }
}

impl Connection<Admitted> {
    pub fn nickname(&self) -> &str {
        &self.state.nickname
    }

    /// Release the connection. The writer task finishes whatever is still
    /// queued and shuts the socket once every outbox sender is gone.
    pub fn close(self) -> JoinHandle<()> {
        self.state.writer_task
    }
}

/// Writer task of one admitted connection. One queued message is one
/// write, so concurrent broadcasts never interleave their bytes.
async fn drain_outbox(
    id: ConnectionId,
    mut writer: MessageWriter,
    mut outbox: mpsc::UnboundedReceiver<Arc<str>>,
) {
    while let Some(message) = outbox.recv().await {
        if let Err(error) = writer.send(&message).await {
            warn!(%id, ?error, "write failed; dropping outbound queue");
            return;
        }
    }
    if let Err(error) = writer.shutdown().await {
        debug!(%id, ?error, "shutdown after close failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MessageReader;

    #[tokio::test]
    async fn admitted_writer_drains_queued_messages_in_order() {
        let (local, remote) = tokio::io::duplex(1024);
        let (local_read, local_write) = tokio::io::split(local);
        let (remote_read, _remote_write) = tokio::io::split(remote);

        let conn = Connection::from_parts(ConnectionId::new(1), None, local_read, local_write);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Arc::from("first")).expect("queue");

        let admitted = conn.admit("alice".to_string(), rx);
        assert_eq!(admitted.nickname(), "alice");

        let mut peer = MessageReader::new(remote_read);
        assert_eq!(peer.read_message().await.expect("read").as_deref(), Some("first"));

        tx.send(Arc::from("second")).expect("queue");
        assert_eq!(peer.read_message().await.expect("read").as_deref(), Some("second"));

        drop(tx);
        admitted.close().await.expect("writer task join");
        assert!(peer.read_message().await.expect("read").is_none());
    }
}
