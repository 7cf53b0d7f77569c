//! Line-oriented console front end.
//!
//! Each input line is `<user_id> <message>`; replies are written one per
//! line. This stands in for a messaging-platform client when running locally.

use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use super::handler::Dispatcher;
use super::store::ProfileStore;
use crate::error::Result;
use crate::ratelimit::RateLimiterBackend;

/// Console server driving a [`Dispatcher`] from stdin.
pub struct ConsoleServer<R: RateLimiterBackend, S: ProfileStore> {
    dispatcher: Arc<Dispatcher<R, S>>,
}

impl<R: RateLimiterBackend, S: ProfileStore> ConsoleServer<R, S> {
    pub fn new(dispatcher: Arc<Dispatcher<R, S>>) -> Self {
        Self { dispatcher }
    }

    /// Serve stdin/stdout until EOF or until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Starting console; enter lines as `<user_id> <message>`");
        let reader = BufReader::new(tokio::io::stdin());
        self.serve_io(reader, tokio::io::stdout(), signal).await
    }

    /// Serve an arbitrary reader/writer pair.
    pub async fn serve_io<I, O, F>(&self, reader: I, mut writer: O, signal: F) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        let mut lines = reader.split(b'\n');
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown signal received, stopping console");
                    break;
                }
                line = lines.next_segment() => {
                    let Some(bytes) = line? else {
                        info!("Console input closed");
                        break;
                    };
                    let Ok(line) = String::from_utf8(bytes) else {
                        warn!("Ignoring console line that is not valid UTF-8");
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    let Some((user_id, text)) = parse_line(&line) else {
                        warn!(line = %line, "Ignoring malformed console line");
                        continue;
                    };

                    for reply in self.dispatcher.handle(user_id, text).await {
                        writer.write_all(reply.as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                    }
                    writer.flush().await?;
                }
            }
        }

        writer.flush().await?;
        Ok(())
    }
}

/// Split `<user_id> <message>`. The message may be empty.
fn parse_line(line: &str) -> Option<(i64, &str)> {
    let line = line.trim();
    let (user_id, text) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let user_id = user_id.parse().ok()?;
    Some((user_id, text.trim()))
}
