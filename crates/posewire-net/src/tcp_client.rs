//! TCP client for talking to a posewire server.
//!
//! Plays the tracker's side of the connection: sends framed messages and
//! reads whatever the server writes back (heartbeats, anchor announcements).
//! Used by the `echo` command and by integration tests.

use std::net::SocketAddr;

use posewire_config::MessageShape;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::framing::{FrameConfig, FrameError, LineFramer, write_frame};
use crate::messages::{self, EncodeError, Message};

/// Errors returned by [`TelemetryClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connecting or reading failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing a frame failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The message could not be serialized.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Connected client session.
pub struct TelemetryClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    framer: LineFramer,
    shape: MessageShape,
    buf: Vec<u8>,
}

impl TelemetryClient {
    /// Connect to the server at `addr`, decoding replies as `shape`.
    pub async fn connect(addr: SocketAddr, shape: MessageShape) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            reader,
            writer,
            framer: LineFramer::new(FrameConfig::default()),
            shape,
            buf: vec![0u8; 4096],
        })
    }

    /// Encode and send one message.
    pub async fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        let payload = messages::encode(message)?;
        write_frame(&mut self.writer, &payload).await?;
        Ok(())
    }

    /// Write raw bytes as-is, without adding a delimiter.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Wait for the next decodable message. Returns `None` once the server
    /// closes the connection. Frames that fail to decode are logged and skipped.
    pub async fn recv(&mut self) -> Result<Option<Message>, ClientError> {
        loop {
            while let Some(frame) = self.framer.next_frame() {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("Client: {e}");
                        continue;
                    }
                };
                match messages::decode(self.shape, &frame) {
                    Ok(Some(message)) => return Ok(Some(message)),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Client: dropping frame: {e}"),
                }
            }

            let n = self.reader.read(&mut self.buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.framer.extend(&self.buf[..n]);
        }
    }

    /// Close the write side, signalling EOF to the server.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
