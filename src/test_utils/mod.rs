mod logging_env;

use crate::DeviceEndpoint;
use crate::ascom::PropertyClient;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

type Reply = dyn Fn(&str) -> Option<String> + Send + Sync;

fn locked<T: Clone>(mutex: &Mutex<T>) -> T {
    mutex.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn local_endpoint(addr: SocketAddr) -> Arc<DeviceEndpoint> {
    Arc::new(DeviceEndpoint::new(addr.ip().to_string(), addr.port()))
}

/// Fake line-protocol server.
///
/// Reads one command per connection and answers with whatever the reply
/// function returns, then hangs up. `None` means stay silent until the client
/// gives up.
pub(crate) struct LineStub {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl LineStub {
    pub(crate) async fn start(
        reply: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> eyre::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let received = Arc::<Mutex<Vec<String>>>::default();
        let connections = Arc::<AtomicUsize>::default();
        let reply: Arc<Reply> = Arc::new(reply);

        let task = tokio::spawn({
            let received = Arc::clone(&received);
            let connections = Arc::clone(&connections);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let _ = connections.fetch_add(1, Ordering::SeqCst);
                    let _conn = tokio::spawn(Self::serve(
                        stream,
                        Arc::clone(&received),
                        Arc::clone(&reply),
                    ));
                }
            }
        });

        Ok(Self {
            addr,
            received,
            connections,
            task,
        })
    }

    async fn serve(stream: TcpStream, received: Arc<Mutex<Vec<String>>>, reply: Arc<Reply>) {
        let mut stream = BufReader::new(stream);
        let mut line = String::new();
        if stream.read_line(&mut line).await.is_err() {
            return;
        }
        let command = line.trim_end_matches(['\r', '\n']).to_owned();
        tracing::debug!(%command, "Stub received command");
        let response = reply(&command);
        received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);

        match response {
            Some(response) => {
                let stream = stream.get_mut();
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
            None => {
                // Wait for the client to give up.
                let mut rest = Vec::new();
                let _ = stream.read_to_end(&mut rest).await;
            }
        }
    }

    pub(crate) fn endpoint(&self) -> Arc<DeviceEndpoint> {
        local_endpoint(self.addr)
    }

    /// Commands received so far, without their terminator.
    pub(crate) fn received(&self) -> Vec<String> {
        locked(&self.received)
    }

    pub(crate) fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Endpoint nothing is listening on.
    pub(crate) async fn unused_endpoint() -> eyre::Result<Arc<DeviceEndpoint>> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        drop(listener);
        Ok(local_endpoint(addr))
    }
}

impl Drop for LineStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Request as seen by [`PropertyStub`].
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) params: BTreeMap<String, String>,
}

#[derive(Clone, Default)]
struct StubState {
    replies: Arc<Mutex<HashMap<String, Value>>>,
    last_request: Arc<Mutex<Option<Recorded>>>,
}

impl StubState {
    fn respond(&self, method: &str, property: String, params: BTreeMap<String, String>) -> Response {
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&property)
            .cloned();
        let client_transaction_id = params
            .get("ClientTransactionID")
            .and_then(|id| id.parse::<u32>().ok());

        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Recorded {
            method: method.to_owned(),
            path: format!("telescope/0/{property}"),
            params,
        });

        let Some(mut reply) = reply else {
            return (StatusCode::NOT_FOUND, format!("no such property: {property}")).into_response();
        };
        if let (Some(object), Some(id)) = (reply.as_object_mut(), client_transaction_id) {
            let _ = object.insert("ClientTransactionID".to_owned(), id.into());
            let _ = object.insert("ServerTransactionID".to_owned(), 1.into());
        }
        Json(reply).into_response()
    }
}

/// Fake Alpaca server exposing telescope 0 with canned property replies.
///
/// Unknown properties answer with `404 Not Found`.
pub(crate) struct PropertyStub {
    addr: SocketAddr,
    state: StubState,
    task: JoinHandle<()>,
}

impl PropertyStub {
    pub(crate) async fn start() -> eyre::Result<Self> {
        let state = StubState::default();

        let router = Router::new()
            .route(
                "/api/v1/telescope/0/{property}",
                get(
                    |State(state): State<StubState>,
                     Path(property): Path<String>,
                     Query(params): Query<BTreeMap<String, String>>| async move {
                        state.respond("GET", property, params)
                    },
                )
                .put(
                    |State(state): State<StubState>,
                     Path(property): Path<String>,
                     Form(params): Form<BTreeMap<String, String>>| async move {
                        state.respond("PUT", property, params)
                    },
                ),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(%err, "Property stub stopped");
            }
        });

        Ok(Self { addr, state, task })
    }

    /// Answer every subsequent `property` request with `body`.
    pub(crate) fn reply(self, property: &str, body: Value) -> Self {
        let _ = self
            .state
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(property.to_owned(), body);
        self
    }

    pub(crate) fn endpoint(&self) -> Arc<DeviceEndpoint> {
        local_endpoint(self.addr)
    }

    pub(crate) fn client(&self) -> eyre::Result<PropertyClient> {
        Ok(PropertyClient::new(self.endpoint(), "v1", Duration::from_secs(2))?)
    }

    pub(crate) fn last_request(&self) -> Option<Recorded> {
        locked(&self.state.last_request)
    }
}

impl Drop for PropertyStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}
