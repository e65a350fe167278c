//! Framed message channel over one byte stream.
//!
//! There is no length prefix and no terminator: whatever a single `read`
//! returns is one message, and every `send` is a single write. A message
//! longer than [`MAX_MESSAGE_LEN`] arrives as several reads. Everything
//! above this module only sees whole `String` messages, so a stricter
//! framing can replace this one without touching the rest of the crate.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload returned by a single read.
pub const MAX_MESSAGE_LEN: usize = 1023;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct MessageReader {
    inner: BoxedReader,
    buf: Vec<u8>,
}

impl MessageReader {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            inner: Box::new(reader),
            buf: vec![0; MAX_MESSAGE_LEN],
        }
    }

    /// Read the next message. `Ok(None)` means the peer closed the stream.
    pub async fn read_message(&mut self) -> io::Result<Option<String>> {
        let n = self.inner.read(&mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&self.buf[..n]).into_owned()))
    }
}

pub struct MessageWriter {
    inner: BoxedWriter,
}

impl MessageWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Box::new(writer),
        }
    }

    /// Write one message as a single contiguous write.
    pub async fn send(&mut self, message: &str) -> io::Result<()> {
        self.inner.write_all(message.as_bytes()).await?;
        self.inner.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}
