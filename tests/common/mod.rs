#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use hub_chat::channel::{MessageReader, MessageWriter};
use hub_chat::config::ServerConfig;
use hub_chat::message::DEFAULT_WELCOME;
use hub_chat::server::{Hub, Server};
use hub_chat::terminal::Console;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Console that remembers everything the hub showed its operator.
#[derive(Default)]
pub struct RecordingConsole {
    lines: Mutex<Vec<String>>,
}

impl RecordingConsole {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    /// Wait until `line` has been shown.
    pub async fn wait_for(&self, line: &str) -> Result<()> {
        timeout(READ_TIMEOUT, async {
            while !self.lines().iter().any(|l| l == line) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .map_err(|_| anyhow!("console never showed {line:?}; saw {:?}", self.lines()))
    }
}

impl Console for RecordingConsole {
    fn message(&self, line: &str) {
        self.push(line);
    }

    fn notice(&self, line: &str) {
        self.push(line);
    }

    fn alert(&self, line: &str) {
        self.push(line);
    }
}

pub struct TestHub {
    pub addr: SocketAddr,
    pub hub: Arc<Hub>,
    pub console: Arc<RecordingConsole>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TestHub {
    pub async fn start(max_clients: usize) -> Result<Self> {
        let console = Arc::new(RecordingConsole::default());
        let config = ServerConfig::builder().max_clients(max_clients).build();
        let hub = Arc::new(Hub::new(config, console.clone()));
        let (addr, shutdown, task) = serve(Arc::clone(&hub)).await?;

        Ok(Self {
            addr,
            hub,
            console,
            shutdown,
            task,
        })
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

/// Run `hub`'s accept loop on an ephemeral local port until the returned
/// sender fires.
pub async fn serve(hub: Arc<Hub>) -> Result<(SocketAddr, oneshot::Sender<()>, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = Server::new(listener, hub);

    let (shutdown, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let _ = server
            .run_until(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    Ok((addr, shutdown, task))
}

/// A raw TCP peer speaking the hub's unframed protocol.
pub struct Peer {
    pub reader: MessageReader,
    pub writer: MessageWriter,
}

impl Peer {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: MessageReader::new(reader),
            writer: MessageWriter::new(writer),
        })
    }

    /// Connect and get admitted as `nickname`.
    pub async fn join(addr: SocketAddr, nickname: &str) -> Result<Self> {
        let mut peer = Self::connect(addr).await?;
        let reply = peer.ask(nickname).await?;
        if reply != DEFAULT_WELCOME {
            return Err(anyhow!("{nickname} not admitted: {reply:?}"));
        }
        Ok(peer)
    }

    pub async fn send(&mut self, message: &str) -> Result<()> {
        self.writer.send(message).await?;
        Ok(())
    }

    pub async fn ask(&mut self, message: &str) -> Result<String> {
        self.send(message).await?;
        self.read().await
    }

    pub async fn read(&mut self) -> Result<String> {
        timeout(READ_TIMEOUT, self.reader.read_message())
            .await??
            .ok_or_else(|| anyhow!("connection closed"))
    }

    /// Read until the hub closes the connection.
    pub async fn read_to_close(&mut self) -> Result<String> {
        let mut seen = String::new();
        loop {
            match timeout(READ_TIMEOUT, self.reader.read_message()).await?? {
                Some(message) => seen.push_str(&message),
                None => return Ok(seen),
            }
        }
    }
}
