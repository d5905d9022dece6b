//! PTY channel for the interactive device shell.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// How many bytes from the end of the buffer are searched for a prompt.
const SEARCH_DEPTH: usize = 1000;

/// Interactive shell channel with pattern-based reads.
pub struct PtyChannel {
    /// Underlying russh channel.
    channel: Channel<Msg>,

    /// Output accumulated since the last successful read.
    buffer: PatternBuffer,
}

impl PtyChannel {
    /// Wrap an already-opened shell channel.
    pub fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(SEARCH_DEPTH),
        }
    }

    /// Send one line of input.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let line = format!("{}\n", text);
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until `pattern` matches the buffer tail, then hand back and
    /// reset the buffer.
    pub async fn read_until_pattern(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.buffer.matches_tail(pattern) {
                return Ok(self.buffer.take());
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout {
                    pattern: pattern.as_str().to_string(),
                    timeout,
                })?;

            match msg {
                Some(ChannelMsg::Data { data }) => self.buffer.push(&data),
                Some(ChannelMsg::ExtendedData { data, .. }) => self.buffer.push(&data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => trace!("Ignoring channel message: {:?}", other),
            }
        }
    }

    /// Close the channel.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}
