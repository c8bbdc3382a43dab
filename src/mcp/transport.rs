//! stdio transport for the MCP gateway.
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! # Concurrency
//!
//! Reading happens on the server loop. Writing is owned by a single writer
//! task fed through an [`OutboundSink`]; every queued message is written as
//! one complete line and flushed before the next, so responses from
//! concurrent tool calls never interleave.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Reads newline-delimited messages from an input stream.
pub struct LineReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wraps an input stream.
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the stream is closed (EOF).
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the line is not valid UTF-8.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // EOF - input closed
            return Ok(None);
        }

        // Remove the trailing newline
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }
}

/// Cloneable handle queueing outbound messages for the writer task.
#[derive(Debug, Clone)]
pub struct OutboundSink {
    tx: mpsc::UnboundedSender<String>,
}

impl OutboundSink {
    /// Serialises a message and queues it as one line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails or the writer has stopped.
    pub fn send<T: Serialize>(&self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.tx
            .send(json)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output writer has stopped"))
    }
}

/// Starts the writer task for `writer`.
///
/// The task ends once every [`OutboundSink`] clone has been dropped and the
/// queue is drained, or on the first write error.
pub fn spawn_writer<W>(writer: W) -> (OutboundSink, JoinHandle<io::Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(write_lines(writer, rx));
    (OutboundSink { tx }, handle)
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(json) = rx.recv().await {
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}
