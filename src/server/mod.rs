//! HTTP API consumed by the desktop GUI.

mod error;

use crate::ascii::{ScopeStatusRecord, Sequence, parse_scope_status};
use crate::endpoint::Endpoints;
use crate::pointing::PointingStatus;
use crate::{Error, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::Instrument;

const READ_SCOPE_STATUS: &str = "ReadScopeStatus";

/// The HTTP frontend.
///
/// All routes are `GET` and answer with JSON:
///
/// | Route | Response |
/// |-------|----------|
/// | `/` | `{}` |
/// | `/ping`, `/test/ping` | `{"result": true}` |
/// | `/status/pointing`, `/ascom/pointing` | [`PointingStatus`] |
/// | `/ascom/test`, `/test/ascom` | whether the Alpaca API answers |
/// | `/ascii/status` | [`ScopeStatusRecord`] |
/// | `/ascii/sync_to_zenith`, `/ascii/park`, `/ascii/goto_cover`, `/ascii/stop` | `true` once the [`Sequence`] completes |
///
/// Faults are answered with `500` and `{"detail": "<message>"}`.
#[derive(Debug)]
pub struct Server {
    /// Where the mount lives.
    pub endpoints: Endpoints,
    /// Address for the server to listen on.
    pub listen_addr: SocketAddr,
    /// Run composite sequences one at a time.
    ///
    /// Off by default: two sequences requested concurrently will interleave
    /// their commands on the mount. Single commands such as `stop` never wait
    /// for this lock.
    pub exclusive_sequences: bool,
}

/// Server bound to its listening socket, not yet serving.
#[derive(Debug)]
pub struct BoundServer {
    listener: TcpListener,
    router: Router,
}

#[derive(Debug, Clone)]
struct AppState {
    endpoints: Arc<Endpoints>,
    sequence_lock: Option<Arc<Mutex<()>>>,
}

impl Server {
    /// Server on `127.0.0.1:8000` without the sequence lock.
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            listen_addr: (Ipv4Addr::LOCALHOST, 8000).into(),
            exclusive_sequences: false,
        }
    }

    /// Bind the listening socket.
    pub async fn bind(self) -> eyre::Result<BoundServer> {
        tracing::debug!(addr = %self.listen_addr, "Binding HTTP server");
        let listener = TcpListener::bind(self.listen_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Bound HTTP server");

        Ok(BoundServer {
            listener,
            router: self.into_router(),
        })
    }

    fn into_router(self) -> Router {
        let state = AppState {
            endpoints: Arc::new(self.endpoints),
            sequence_lock: self.exclusive_sequences.then(Arc::default),
        };

        Router::new()
            .route("/", get(|| async { Json(json!({})) }))
            .route("/ping", get(ping))
            .route("/test/ping", get(ping))
            .route("/status/pointing", get(pointing))
            .route("/ascom/pointing", get(pointing))
            .route("/ascom/test", get(ascom_test))
            .route("/test/ascom", get(ascom_test))
            .route("/ascii/status", get(ascii_status))
            .route(
                "/ascii/sync_to_zenith",
                get(|State(state): State<AppState>| run_sequence(state, Sequence::SyncToZenith)),
            )
            .route(
                "/ascii/park",
                get(|State(state): State<AppState>| run_sequence(state, Sequence::Park)),
            )
            .route(
                "/ascii/goto_cover",
                get(|State(state): State<AppState>| run_sequence(state, Sequence::GotoCover)),
            )
            .route(
                "/ascii/stop",
                get(|State(state): State<AppState>| run_sequence(state, Sequence::Stop)),
            )
            .with_state(state)
    }
}

impl BoundServer {
    /// Address actually bound, useful when the requested port was 0.
    pub fn listen_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> eyre::Result<()> {
        self.start_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "Couldn't listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
        })
        .await
    }

    /// Serve until `shutdown` resolves.
    pub async fn start_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> eyre::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

async fn ping() -> Json<Value> {
    Json(json!({ "result": true }))
}

#[tracing::instrument(skip_all)]
async fn pointing(State(state): State<AppState>) -> Result<Json<PointingStatus>> {
    let client = state.endpoints.property_client()?;
    Ok(Json(client.pointing_status().await?))
}

#[tracing::instrument(skip_all)]
async fn ascom_test(State(state): State<AppState>) -> Json<bool> {
    Json(match state.endpoints.property_client() {
        Ok(client) => client.test().await,
        Err(err) => {
            tracing::warn!(%err, "Couldn't build Alpaca client");
            false
        }
    })
}

#[tracing::instrument(skip_all)]
async fn ascii_status(State(state): State<AppState>) -> Result<Json<ScopeStatusRecord>> {
    let line = state
        .endpoints
        .line_client()
        .send_command(READ_SCOPE_STATUS)
        .await?;
    Ok(Json(parse_scope_status(&line)?))
}

/// Runs `sequence` on its own task.
///
/// Mount motion must not depend on the HTTP caller: if the request is dropped
/// mid-way the remaining steps still go out, and failures are still logged.
#[tracing::instrument(skip(state))]
async fn run_sequence(state: AppState, sequence: Sequence) -> Result<Json<bool>> {
    let task = tokio::spawn(
        async move {
            let _guard = match &state.sequence_lock {
                Some(lock) if sequence.is_composite() => {
                    tracing::debug!("Waiting for sequence lock");
                    Some(lock.lock().await)
                }
                _ => None,
            };

            let mut client = state.endpoints.line_client();
            sequence.run(&mut client).await
        }
        .in_current_span(),
    );

    match task.await {
        Ok(result) => result.map(|_responses| Json(true)),
        Err(source) => Err(Error::SequenceAborted {
            sequence: sequence.name(),
            source,
        }),
    }
}
