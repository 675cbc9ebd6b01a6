use super::connection::Connection;
use crate::endpoint::DeviceEndpoint;
use crate::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tracing::Instrument;

/// Response deadline used unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest response line accepted, terminator included.
pub const MAX_RESPONSE_LEN: u64 = 4096;

/// Anything that can carry one line-protocol command to the mount.
#[async_trait]
pub trait CommandSink: Send {
    /// Send `command` and return the trimmed response line.
    async fn send_command(&mut self, command: &str) -> Result<String>;
}

/// Client for the ASCII line-protocol server.
///
/// The protocol has no request IDs, so every command gets a brand new TCP
/// connection which is torn down again once the response line is read. A
/// connection is never reused across commands.
#[derive(Debug)]
pub struct LineProtocolClient {
    endpoint: Arc<DeviceEndpoint>,
    timeout: Duration,
    connection: Connection,
}

impl LineProtocolClient {
    /// Disconnected client with the default timeout.
    pub fn new(endpoint: Arc<DeviceEndpoint>) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            connection: Connection::Disconnected,
        }
    }

    /// Override the per-exchange timeout (also bounds connecting).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a socket is currently open.
    pub const fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Open a TCP stream to the server.
    pub async fn connect(&mut self) -> Result {
        self.connection.connect(&self.endpoint, self.timeout).await
    }

    /// Close the stream if open. Idempotent.
    pub async fn disconnect(&mut self) {
        self.connection.disconnect().await;
    }

    /// Send one command with the configured timeout.
    pub async fn send_command(&mut self, command: &str) -> Result<String> {
        self.send_command_with_timeout(command, self.timeout).await
    }

    /// Send one command and wait at most `timeout` for its response line.
    pub async fn send_command_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String> {
        let span = tracing::debug_span!("Line exchange", command, addr = %self.endpoint);

        async move {
            // A previous exchange may have died half-way; start from a clean socket.
            self.disconnect().await;
            self.connect().await?;

            let result = self.exchange(command, timeout).await;
            self.disconnect().await;

            match &result {
                Ok(response) => tracing::debug!(%response, "Received response"),
                Err(err) => tracing::error!(%err, "Line exchange failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn exchange(&mut self, command: &str, timeout: Duration) -> Result<String> {
        let protocol_error = |source: io::Error| Error::Protocol {
            command: command.to_owned(),
            source,
        };

        let stream = self.connection.stream().ok_or_else(|| {
            protocol_error(io::Error::new(io::ErrorKind::NotConnected, "not connected"))
        })?;

        let mut line = command.to_owned();
        if !line.ends_with('\n') {
            line.push('\n');
        }

        stream
            .get_mut()
            .write_all(line.as_bytes())
            .await
            .map_err(protocol_error)?;
        stream.get_mut().flush().await.map_err(protocol_error)?;

        let mut response = String::new();
        let mut limited = stream.take(MAX_RESPONSE_LEN);
        match tokio::time::timeout(timeout, limited.read_line(&mut response)).await {
            Err(_elapsed) => Err(Error::ProtocolTimeout {
                command: command.to_owned(),
                timeout,
            }),
            Ok(Err(source)) => Err(protocol_error(source)),
            Ok(Ok(_)) if response.ends_with('\n') => Ok(response.trim().to_owned()),
            Ok(Ok(read)) if u64::try_from(read) == Ok(MAX_RESPONSE_LEN) => {
                Err(protocol_error(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("response line longer than {MAX_RESPONSE_LEN} bytes"),
                )))
            }
            Ok(Ok(_)) => Err(protocol_error(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before a full response line",
            ))),
        }
    }
}

#[async_trait]
impl CommandSink for LineProtocolClient {
    async fn send_command(&mut self, command: &str) -> Result<String> {
        Self::send_command(self, command).await
    }
}
