//! Line transport for JSON-RPC 2.0 over NDJSON
//!
//! Reads one JSON message per line and writes one per line. Generic over the
//! underlying streams; [`StdioTransport`] is the stdin/stdout instance the
//! binary uses.

use crate::error::McpResult;
use serde::Serialize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// NDJSON transport over an arbitrary reader/writer pair
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// Transport bound to the process's stdin and stdout
pub type StdioTransport = LineTransport<BufReader<io::Stdin>, io::Stdout>;

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next non-empty line, or `None` at EOF
    pub async fn read_line(&mut self) -> McpResult<Option<String>> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line).await? {
                0 => return Ok(None),
                _ => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        return Ok(Some(trimmed.to_string()));
                    }
                }
            }
        }
    }

    /// Write a line and flush
    pub async fn write_line(&mut self, line: &str) -> McpResult<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Serialize `message` as a single line and write it
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> McpResult<()> {
        let line = serde_json::to_string(message)?;
        self.write_line(&line).await
    }
}

impl StdioTransport {
    /// Create a transport over stdin/stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}
