use crate::ascii::LineProtocolClient;
use crate::ascom::PropertyClient;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Address of one device role on the network.
///
/// Built once from configuration and shared read-only between requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceEndpoint {
    host: String,
    port: u16,
    device: u32,
}

impl DeviceEndpoint {
    /// Endpoint for device number 0 at the given address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            device: 0,
        }
    }

    /// Same address, different device number.
    #[must_use]
    pub const fn with_device(mut self, device: u32) -> Self {
        self.device = device;
        self
    }

    /// Host name or IP address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Device number within the server.
    pub const fn device(&self) -> u32 {
        self.device
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Everything request handlers need to reach the mount.
///
/// Each request asks for its own transient client; nothing here is mutated
/// after startup.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Alpaca property API.
    pub ascom: Arc<DeviceEndpoint>,
    /// Alpaca API version segment, e.g. `v1`.
    pub api_version: String,
    /// Per-call HTTP timeout.
    pub ascom_timeout: Duration,
    /// ASCII line-protocol server.
    pub ascii: Arc<DeviceEndpoint>,
    /// Per-exchange line-protocol timeout.
    pub ascii_timeout: Duration,
}

impl Endpoints {
    /// Fresh property client for one request.
    pub fn property_client(&self) -> crate::Result<PropertyClient> {
        PropertyClient::new(Arc::clone(&self.ascom), &self.api_version, self.ascom_timeout)
    }

    /// Fresh, disconnected line-protocol client for one request.
    pub fn line_client(&self) -> LineProtocolClient {
        LineProtocolClient::new(Arc::clone(&self.ascii)).with_timeout(self.ascii_timeout)
    }
}
