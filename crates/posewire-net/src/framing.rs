//! Newline-delimited framing for TCP streams.
//!
//! Every message on the wire is one line of UTF-8 text:
//!
//! ```text
//! +----------------------+------+
//! |   payload            | '\n' |
//! |   (no '\n' inside)   |      |
//! +----------------------+------+
//! ```
//!
//! There is no length prefix, so the receiving side has to reassemble frames
//! from reads whose boundaries are unrelated to message boundaries.
//! [`LineFramer`] keeps the undelimited remainder between reads and hands out
//! complete frames as they become available.

use tokio::io::AsyncWriteExt;

/// Frame terminator.
pub const DELIMITER: u8 = b'\n';

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum number of bytes a single frame may occupy before its delimiter.
    /// Default: 64 KiB.
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: 64 * 1024,
        }
    }
}

/// Errors that can occur during framing operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// More than `max` bytes arrived without a delimiter.
    #[error("frame exceeds {max} bytes without a delimiter")]
    FrameTooLong {
        /// The configured maximum.
        max: usize,
    },

    /// The payload handed to [`write_frame`] contains the delimiter itself.
    #[error("payload contains a frame delimiter")]
    EmbeddedDelimiter,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Incremental splitter for a newline-delimited byte stream.
///
/// Feed raw reads with [`extend`](Self::extend), then pull complete frames
/// with [`next_frame`](Self::next_frame) until it returns `None`.
///
/// An oversized frame yields a single [`FrameError::FrameTooLong`]; the framer
/// then drops everything up to and including the next delimiter and carries on
/// with the frame after it.
#[derive(Debug)]
pub struct LineFramer {
    config: FrameConfig,
    buf: Vec<u8>,
    /// Bytes before this offset are known to contain no delimiter.
    scanned: usize,
    /// Skipping the tail of an oversized frame.
    discarding: bool,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            buf: Vec::new(),
            scanned: 0,
            discarding: false,
        }
    }

    /// Append a chunk of raw bytes as received from the transport.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete frame, without its delimiter.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>, FrameError>> {
        loop {
            let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == DELIMITER)
            else {
                return self.on_incomplete();
            };

            let end = self.scanned + offset;
            let mut frame: Vec<u8> = self.buf.drain(..=end).collect();
            frame.pop();
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            if frame.len() > self.config.max_frame_len {
                return Some(Err(FrameError::FrameTooLong {
                    max: self.config.max_frame_len,
                }));
            }

            return Some(Ok(frame));
        }
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    fn on_incomplete(&mut self) -> Option<Result<Vec<u8>, FrameError>> {
        if self.discarding {
            self.buf.clear();
            self.scanned = 0;
            return None;
        }

        if self.buf.len() > self.config.max_frame_len {
            self.buf.clear();
            self.scanned = 0;
            self.discarding = true;
            return Some(Err(FrameError::FrameTooLong {
                max: self.config.max_frame_len,
            }));
        }

        self.scanned = self.buf.len();
        None
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

/// Write a single payload followed by the delimiter, then flush.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), FrameError> {
    if payload.contains(&DELIMITER) {
        return Err(FrameError::EmbeddedDelimiter);
    }

    writer.write_all(payload).await?;
    writer.write_all(&[DELIMITER]).await?;
    writer.flush().await?;

    Ok(())
}
