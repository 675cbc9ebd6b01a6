use super::transaction::{RequestTransaction, RequestWithTransaction, ResponseTransaction};
use crate::endpoint::DeviceEndpoint;
use crate::errors::{DeviceError, ErrorCode};
use crate::{Error, Result};
use futures::TryFutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// HTTP verb of a property call: `Get` reads, `Put` writes or invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a property.
    Get,
    /// Write a property or invoke a method.
    Put,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Put => Self::PUT,
        }
    }
}

/// Request parameters, sent as query string for `Get` and as form body for `Put`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// No parameters.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add a parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Display) -> Self {
        let _ = self.0.insert(name.into(), value.to_string());
        self
    }
}

/// Outcome of one property call.
///
/// `error_code` is [`ErrorCode::OK`] on success; otherwise `value` is usually
/// absent and `error_message` explains why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyResult {
    /// Normalised path, e.g. `telescope/0/altitude`.
    pub path: String,
    /// `Value` field of the response, if any.
    pub value: Option<serde_json::Value>,
    /// `ErrorNumber` field of the response.
    pub error_code: ErrorCode,
    /// `ErrorMessage` field of the response, `None` when empty.
    pub error_message: Option<String>,
}

impl PropertyResult {
    /// Whether the device reported success.
    pub const fn is_ok(&self) -> bool {
        self.error_code.is_ok()
    }

    /// Numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_ref()?.as_f64()
    }

    /// String value.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref()?.as_str()
    }

    /// Device error carried by this result, if any.
    pub fn device_error(&self) -> Option<DeviceError> {
        (!self.is_ok()).then(|| DeviceError {
            code: self.error_code,
            message: self.error_message.clone().unwrap_or_default(),
            path: self.path.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PropertyResponse {
    #[serde(flatten)]
    transaction: ResponseTransaction,
    #[serde(rename = "Value")]
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(rename = "ErrorNumber")]
    #[serde(default)]
    error_number: ErrorCode,
    #[serde(rename = "ErrorMessage")]
    #[serde(default)]
    error_message: Option<String>,
}

/// Client for the telescope device of an Alpaca server.
#[derive(Debug, Clone)]
pub struct PropertyClient {
    inner: reqwest::Client,
    endpoint: Arc<DeviceEndpoint>,
    base_url: reqwest::Url,
    timeout: Duration,
    client_id: u32,
}

impl PropertyClient {
    /// Client for `http://<host>:<port>/api/<api_version>/`.
    pub fn new(endpoint: Arc<DeviceEndpoint>, api_version: &str, timeout: Duration) -> Result<Self> {
        let base_url = reqwest::Url::parse(&format!("http://{endpoint}/api/{api_version}/"))
            .map_err(|err| Error::Config(format!("invalid Alpaca base URL for {endpoint}: {err}")))?;

        Ok(Self {
            inner: reqwest::Client::new(),
            endpoint,
            base_url,
            timeout,
            client_id: std::process::id(),
        })
    }

    /// Base URL every property path is resolved against.
    pub const fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// Prefix `path` with `telescope/<device>/` unless it already names the
    /// device, and collapse repeated slashes.
    pub fn normalize_path(&self, path: &str) -> String {
        let prefix = format!("telescope/{}/", self.endpoint.device());
        let path = path.trim_start_matches('/');

        let mut full = if path.starts_with(&prefix) || path == prefix.trim_end_matches('/') {
            path.to_owned()
        } else {
            format!("{prefix}{path}")
        };

        let mut last = '\0';
        full.retain(|c| {
            let keep = !(c == '/' && last == '/');
            last = c;
            keep
        });
        full
    }

    /// Call one property.
    ///
    /// Non-success HTTP statuses and other transport failures are always
    /// returned as [`Error::Transport`]. A non-zero `ErrorNumber` becomes
    /// [`Error::Device`] when `raise_on_error` is set, and is otherwise
    /// reported inside the returned [`PropertyResult`].
    pub async fn call_property(
        &self,
        path: &str,
        method: Method,
        params: &Params,
        raise_on_error: bool,
    ) -> Result<PropertyResult> {
        let path = self.normalize_path(path);
        let request_transaction = RequestTransaction::new(self.client_id);

        let span = tracing::debug_span!(
            "Alpaca property",
            %path,
            ?method,
            ?params,
            client_transaction_id = request_transaction.client_transaction_id,
        );

        async {
            let url = self.base_url.join(&path).map_err(|err| {
                Error::Config(format!("invalid property path {path:?}: {err}"))
            })?;

            let body = RequestWithTransaction {
                transaction: request_transaction,
                params,
            };
            let request = self
                .inner
                .request(method.into(), url)
                .timeout(self.timeout);
            let request = match method {
                Method::Get => request.query(&body),
                Method::Put => request.form(&body),
            };

            let response = request
                .send()
                .and_then(|response| async move { response.error_for_status() })
                .and_then(reqwest::Response::json::<PropertyResponse>)
                .await
                .map_err(|source| Error::Transport {
                    path: path.clone(),
                    source,
                })?;

            tracing::trace!(
                server_transaction_id = response.transaction.server_transaction_id,
                "Received response",
            );
            match response.transaction.client_transaction_id {
                Some(received) if received != request_transaction.client_transaction_id => {
                    tracing::warn!(
                        sent = request_transaction.client_transaction_id,
                        received,
                        "ClientTransactionID mismatch",
                    );
                }
                _ => {}
            }

            let result = PropertyResult {
                path,
                value: response.value.filter(|value| !value.is_null()),
                error_code: response.error_number,
                error_message: response.error_message.filter(|msg| !msg.is_empty()),
            };

            if let Some(err) = result.device_error() {
                if raise_on_error {
                    return Err(err.into());
                }
                tracing::warn!(%err, "Device reported an error");
            }

            Ok(result)
        }
        .inspect_err(|err| tracing::error!(%err, "Alpaca request failed"))
        .instrument(span)
        .await
    }

    /// Read a property, raising device errors.
    pub async fn get(&self, path: &str) -> Result<PropertyResult> {
        self.call_property(path, Method::Get, &Params::new(), true).await
    }

    /// Write a property or invoke a method, raising device errors.
    pub async fn put(&self, path: &str, params: &Params) -> Result<PropertyResult> {
        self.call_property(path, Method::Put, params, true).await
    }

    /// Liveness probe: whether `connected` can be read without any fault.
    pub async fn test(&self) -> bool {
        match self.get("connected").await {
            Ok(_) => true,
            Err(err) => {
                tracing::info!(%err, "Alpaca liveness probe failed");
                false
            }
        }
    }
}
