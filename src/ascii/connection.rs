use crate::endpoint::DeviceEndpoint;
use crate::{Error, Result};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Socket lifecycle of a line-protocol client.
///
/// Holds at most one stream. Dropping a `Connected` value closes the socket,
/// so a cancelled exchange never leaves a half-read stream behind.
#[derive(Debug, Default)]
pub(crate) enum Connection {
    #[default]
    Disconnected,
    Connected(BufReader<TcpStream>),
}

impl Connection {
    pub(crate) const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// Dial the endpoint, replacing any existing stream.
    pub(crate) async fn connect(&mut self, endpoint: &DeviceEndpoint, timeout: Duration) -> Result {
        self.disconnect().await;

        let addr = endpoint.to_string();
        let stream = match tokio::time::timeout(
            timeout,
            TcpStream::connect((endpoint.host(), endpoint.port())),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(Error::Connection { addr, source }),
            Err(_elapsed) => {
                return Err(Error::Connection {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };

        tracing::debug!(%addr, "Connected to line-protocol server");
        *self = Self::Connected(BufReader::new(stream));
        Ok(())
    }

    /// Close the stream if there is one. Safe to call in any state.
    pub(crate) async fn disconnect(&mut self) {
        if let Self::Connected(mut stream) = std::mem::take(self) {
            if let Err(err) = stream.get_mut().shutdown().await {
                // The peer may have closed first; the socket is dropped either way.
                tracing::trace!(%err, "Socket shutdown failed");
            }
            tracing::debug!("Disconnected from line-protocol server");
        }
    }

    pub(crate) fn stream(&mut self) -> Option<&mut BufReader<TcpStream>> {
        match self {
            Self::Connected(stream) => Some(stream),
            Self::Disconnected => None,
        }
    }
}
