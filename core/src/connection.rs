/*
 * connection.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Gemlet, a minimal Gemini client.
 *
 * Gemlet is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Gemlet is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Gemlet.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Connection manager: one TCP+TLS session, one request, one streamed response.
//!
//! `start()` spawns the connection task, which connects, handshakes, writes the queued
//! request and then reads until end-of-stream or error. `send()` only queues: the request
//! may be handed over before the handshake has finished and the task writes it once the
//! session is ready. Every outcome is reported through the `ConnectionHandler` and the
//! completion signal returned by `closed()`; nothing fails synchronously.
//!
//! States: Setup -> Preparing -> Ready -> {Failed, Cancelled}. `Waiting` is a diagnostic
//! reported while still preparing and never causes teardown.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;

use crate::config::ClientOptions;
use crate::error::GeminiError;
use crate::net;
use crate::receive::ResponseStream;
use crate::request::Request;
use crate::uri::Endpoint;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Setup,
    Preparing,
    /// A recoverable condition while preparing (e.g. one address unreachable).
    Waiting(String),
    Ready,
    Failed(GeminiError),
    Cancelled,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed(_) | ConnectionState::Cancelled)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Setup => f.write_str("setup"),
            ConnectionState::Preparing => f.write_str("preparing"),
            ConnectionState::Waiting(d) => write!(f, "waiting ({})", d),
            ConnectionState::Ready => f.write_str("ready"),
            ConnectionState::Failed(e) => write!(f, "failed ({})", e),
            ConnectionState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// How the connection ended; delivered once through `Connection::closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The peer closed the stream after the response.
    Completed,
    /// Stopped before the response ended.
    Cancelled,
    Failed(GeminiError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Receives connection events (push model). The connection task drives it in order:
/// state changes, then `received` for each chunk, then `end_of_stream` or `receive_failed`.
///
/// Callbacks run on the connection task and must not call back into the `Connection`.
pub trait ConnectionHandler: Send {
    /// Called for every recorded state change, terminal ones included.
    fn state_changed(&mut self, state: &ConnectionState) {
        let _ = state;
    }

    /// A non-empty chunk of response bytes. Data is only valid for the duration of the call.
    fn received(&mut self, data: &[u8]);

    /// The peer closed the stream.
    fn end_of_stream(&mut self) {}

    /// Reading the response failed; the connection is torn down after this returns.
    fn receive_failed(&mut self, error: &GeminiError) {
        let _ = error;
    }
}

type SendCallback = Box<dyn for<'a> FnOnce(Result<&'a [u8], &'a GeminiError>) + Send>;

struct PendingSend {
    request: Request,
    on_complete: SendCallback,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State shared between the `Connection` handle and its task.
struct Shared {
    state: Mutex<ConnectionState>,
    handler: Mutex<Option<Box<dyn ConnectionHandler>>>,
    stopped: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    done_tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl Shared {
    fn notify(&self, f: impl FnOnce(&mut dyn ConnectionHandler)) {
        if let Some(handler) = lock(&self.handler).as_mut() {
            f(handler.as_mut());
        }
    }

    /// Record and report a state change. Terminal states are final; `Failed` and
    /// `Cancelled` lead to `stop`.
    fn transition(&self, next: ConnectionState) {
        {
            let mut state = lock(&self.state);
            if state.is_terminal() {
                debug!("ignoring {} after {}", next, state);
                return;
            }
            *state = next.clone();
        }
        match &next {
            ConnectionState::Waiting(d) => info!("waiting: {}", d),
            ConnectionState::Failed(e) => warn!("connection failed: {}", e),
            ConnectionState::Cancelled => info!("connection cancelled"),
            other => debug!("connection {}", other),
        }
        self.notify(|h| h.state_changed(&next));
        match next {
            ConnectionState::Failed(e) => self.stop(Outcome::Failed(e)),
            ConnectionState::Cancelled => self.stop(Outcome::Cancelled),
            _ => {}
        }
    }

    /// Idempotent teardown: release the transport, settle the state, fire the completion
    /// signal. Only the first call has any effect.
    fn stop(&self, outcome: Outcome) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = lock(&self.task).take() {
            // dropping the task drops the socket
            task.abort();
        }
        let cancelled = {
            let mut state = lock(&self.state);
            if state.is_terminal() {
                false
            } else {
                *state = ConnectionState::Cancelled;
                true
            }
        };
        if cancelled {
            info!("connection cancelled");
            self.notify(|h| h.state_changed(&ConnectionState::Cancelled));
        }
        info!("connection stopped");
        if let Some(tx) = lock(&self.done_tx).take() {
            let _ = tx.send(outcome);
        }
    }
}

/// Connection manager bound to one endpoint.
pub struct Connection {
    endpoint: Endpoint,
    connector: TlsConnector,
    chunk_size: usize,
    shared: Arc<Shared>,
    request_tx: Option<oneshot::Sender<PendingSend>>,
    request_rx: Option<oneshot::Receiver<PendingSend>>,
    done_rx: Option<oneshot::Receiver<Outcome>>,
}

impl Connection {
    /// Build the connection and its TLS connector. No I/O happens until `start`.
    pub fn new(endpoint: Endpoint, options: ClientOptions) -> Result<Self, GeminiError> {
        let connector = net::connector(&options)?;
        let (request_tx, request_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        Ok(Self {
            endpoint,
            connector,
            chunk_size: options.chunk_size.max(1),
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Setup),
                handler: Mutex::new(None),
                stopped: AtomicBool::new(false),
                task: Mutex::new(None),
                done_tx: Mutex::new(Some(done_tx)),
            }),
            request_tx: Some(request_tx),
            request_rx: Some(request_rx),
            done_rx: Some(done_rx),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.shared.state).clone()
    }

    /// Register `handler` and spawn the connection task (TCP connect, TLS handshake,
    /// request, receive loop). Must be called within a tokio runtime. Only the first call
    /// does anything, and nothing happens once the connection has been stopped.
    pub fn start(&mut self, handler: impl ConnectionHandler + 'static) {
        let Some(request_rx) = self.request_rx.take() else {
            debug!("start called twice; ignored");
            return;
        };
        if self.shared.stopped.load(Ordering::SeqCst) {
            debug!("start called after stop; ignored");
            return;
        }
        info!("starting connection to {}", self.endpoint);
        *lock(&self.shared.handler) = Some(Box::new(handler));
        let task = tokio::spawn(run(
            self.shared.clone(),
            self.endpoint.clone(),
            self.connector.clone(),
            self.chunk_size,
            request_rx,
        ));
        *lock(&self.shared.task) = Some(task);
    }

    /// Queue the request. It is written as soon as the TLS session is ready; `on_complete`
    /// then gets the bytes written or the send error. A failed send tears the connection
    /// down. Only one request is ever sent: later calls fail through their callback.
    pub fn send<F>(&mut self, request: Request, on_complete: F)
    where
        F: for<'a> FnOnce(Result<&'a [u8], &'a GeminiError>) + Send + 'static,
    {
        let pending = PendingSend { request, on_complete: Box::new(on_complete) };
        match self.request_tx.take() {
            Some(tx) => {
                if let Err(pending) = tx.send(pending) {
                    let err = GeminiError::Send("connection already closed".to_string());
                    (pending.on_complete)(Err(&err));
                }
            }
            None => {
                let err = GeminiError::Send("request already sent".to_string());
                (pending.on_complete)(Err(&err));
            }
        }
    }

    /// Tear down the connection. Safe to call any number of times, from any state.
    pub fn stop(&self) {
        self.shared.stop(Outcome::Cancelled);
    }

    /// Wait for teardown. The first call receives the outcome; later calls, or a
    /// connection dropped without teardown, yield `Cancelled`.
    pub async fn closed(&mut self) -> Outcome {
        match self.done_rx.take() {
            Some(rx) => rx.await.unwrap_or(Outcome::Cancelled),
            None => Outcome::Cancelled,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.stop(Outcome::Cancelled);
    }
}

/// The connection task. Owns the transport for its whole life.
async fn run(
    shared: Arc<Shared>,
    endpoint: Endpoint,
    connector: TlsConnector,
    chunk_size: usize,
    request_rx: oneshot::Receiver<PendingSend>,
) {
    shared.transition(ConnectionState::Preparing);
    let tcp = match net::connect_tcp(&endpoint, |d| shared.transition(ConnectionState::Waiting(d))).await {
        Ok(tcp) => tcp,
        Err(e) => {
            shared.transition(ConnectionState::Failed(e));
            return;
        }
    };
    let stream = match net::handshake(&connector, endpoint.host(), tcp).await {
        Ok(stream) => stream,
        Err(e) => {
            shared.transition(ConnectionState::Failed(e));
            return;
        }
    };
    shared.transition(ConnectionState::Ready);

    let pending = match request_rx.await {
        Ok(pending) => pending,
        Err(_) => {
            debug!("no request queued");
            shared.stop(Outcome::Cancelled);
            return;
        }
    };
    let outcome = exchange(&shared, stream, pending, chunk_size).await;
    shared.stop(outcome);
}

/// Write the request, report it to its callback, then stream the response. A failed
/// write ends the exchange without reading.
async fn exchange<S>(shared: &Shared, mut stream: S, pending: PendingSend, chunk_size: usize) -> Outcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let bytes = pending.request.to_bytes();
    if let Err(e) = write_request(&mut stream, &bytes).await {
        let err = GeminiError::Send(e.to_string());
        warn!("{}", err);
        (pending.on_complete)(Err(&err));
        return Outcome::Failed(err);
    }
    debug!("sent {:?}", String::from_utf8_lossy(&bytes));
    (pending.on_complete)(Ok(&bytes[..]));
    receive_loop(shared, ResponseStream::new(stream, chunk_size)).await
}

async fn write_request<W>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Deliver chunks until the stream ends. Never reads again after a terminal signal.
async fn receive_loop<R>(shared: &Shared, mut chunks: ResponseStream<R>) -> Outcome
where
    R: AsyncRead + Unpin,
{
    let mut total = 0usize;
    loop {
        match chunks.next_chunk().await {
            Some(Ok(chunk)) => {
                total += chunk.len();
                debug!("received {} bytes", chunk.len());
                shared.notify(|h| h.received(&chunk));
            }
            Some(Err(e)) => {
                warn!("{}", e);
                shared.notify(|h| h.receive_failed(&e));
                return Outcome::Failed(e);
            }
            None => {
                info!("end of stream after {} bytes", total);
                shared.notify(|h| h.end_of_stream());
                return Outcome::Completed;
            }
        }
    }
}
