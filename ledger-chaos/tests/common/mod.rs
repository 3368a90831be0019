//! In-process ledger service for integration tests.
//!
//! Balances live outside the server task, so a kill drops every open
//! connection but keeps committed state, like a service with durable
//! storage. `start()`/`terminate()` make it a `ProcessControl`, so the chaos
//! injector can crash and restart it for real over TCP.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

use ledger_chaos::process::{ProcessControl, ProcessError, ProcessId};
use ledger_chaos::StopSignal;
use ledger_client::{ClientConfig, ConnectPolicy, LedgerClient, TcpTransport};
use ledger_types::{AccountId, Request, Response};

/// How the test ledger treats writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Atomic transfers, every response delivered.
    Correct,
    /// Apply every n-th transfer, then hang up without answering.
    LoseEveryNthTransferResponse(usize),
    /// Every n-th transfer credits the destination without debiting the source.
    MintOnEveryNthTransfer(usize),
    /// Apply every n-th put, then hang up without answering.
    LoseEveryNthPutResponse(usize),
}

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub struct Received {
    /// Operation name.
    pub operation: &'static str,
    /// Whether the observed stop signal was already set.
    pub stop_set: bool,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<AccountId, i32>,
    log_length: i32,
    puts: usize,
    transfers: usize,
    received: Vec<Received>,
}

struct Shared {
    address: SocketAddr,
    behavior: Behavior,
    state: Mutex<LedgerState>,
    server: Mutex<Option<JoinHandle<()>>>,
    observer: Mutex<Option<StopSignal>>,
    starts: Mutex<usize>,
}

/// Crashable in-process ledger.
#[derive(Clone)]
pub struct TestLedger {
    shared: Arc<Shared>,
}

impl TestLedger {
    /// Reserve a local port; the service is down until `start()`.
    pub async fn new(behavior: Behavior) -> Self {
        let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = reserved.local_addr().unwrap();
        drop(reserved);

        Self {
            shared: Arc::new(Shared {
                address,
                behavior,
                state: Mutex::new(LedgerState::default()),
                server: Mutex::new(None),
                observer: Mutex::new(None),
                starts: Mutex::new(0),
            }),
        }
    }

    /// `ip:port` of the service.
    pub fn address(&self) -> String {
        self.shared.address.to_string()
    }

    /// Record the state of `stop` with every request.
    pub fn observe(&self, stop: StopSignal) {
        *self.shared.observer.lock().unwrap() = Some(stop);
    }

    /// Every request received so far.
    pub fn received(&self) -> Vec<Received> {
        self.shared.state.lock().unwrap().received.clone()
    }

    /// Sum of all balances, read directly.
    pub fn total(&self) -> i64 {
        let state = self.shared.state.lock().unwrap();
        state.balances.values().map(|&b| i64::from(b)).sum()
    }

    /// Committed balance of `account`, read directly.
    pub fn balance(&self, account: &AccountId) -> Option<i32> {
        self.shared.state.lock().unwrap().balances.get(account).copied()
    }

    /// Whether the server is currently accepting connections.
    pub fn is_up(&self) -> bool {
        self.shared.server.lock().unwrap().is_some()
    }

    /// Client tuned for fast local tests.
    pub fn client(&self) -> LedgerClient<TcpTransport> {
        LedgerClient::new(
            self.address(),
            TcpTransport::new(),
            ClientConfig {
                failure_delay: Duration::from_millis(5),
                connect: ConnectPolicy {
                    initial_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(20),
                    jitter: Duration::from_millis(1),
                },
            },
        )
    }
}

#[async_trait]
impl ProcessControl for TestLedger {
    async fn start(&self) -> Result<ProcessId, ProcessError> {
        let mut attempts = 0;
        let listener = loop {
            match TcpListener::bind(self.shared.address).await {
                Ok(listener) => break listener,
                Err(_) if attempts < 100 => {
                    attempts += 1;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Err(e) => return Err(ProcessError::Io(e)),
            }
        };

        let handle = tokio::spawn(serve(listener, self.shared.clone()));
        *self.shared.server.lock().unwrap() = Some(handle);

        let mut starts = self.shared.starts.lock().unwrap();
        *starts += 1;
        Ok(ProcessId::new(format!("ledger-{}", *starts)))
    }

    async fn terminate(&self, _id: &ProcessId) -> Result<(), ProcessError> {
        let handle = self.shared.server.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            // Wait until the listener and all connections are dropped.
            let _ = handle.await;
        }
        Ok(())
    }
}

async fn serve(listener: TcpListener, shared: Arc<Shared>) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                if let Ok((socket, _)) = accepted {
                    let shared = shared.clone();
                    connections.spawn(async move {
                        let _ = handle_connection(socket, shared).await;
                    });
                }
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

async fn handle_connection(mut socket: TcpStream, shared: Arc<Shared>) -> io::Result<()> {
    let mut len_buf = [0u8; 4];
    socket.read_exact(&mut len_buf).await?;
    let mut data = vec![0u8; u32::from_be_bytes(len_buf) as usize];
    socket.read_exact(&mut data).await?;

    let request = Request::from_bytes(&data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let (response, deliver) = apply(&shared, &request);
    if !deliver {
        return Ok(());
    }

    let bytes = response
        .to_bytes()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    socket.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    socket.write_all(&bytes).await?;
    socket.flush().await
}

/// Apply one request atomically. Returns the response and whether to send it.
fn apply(shared: &Shared, request: &Request) -> (Response, bool) {
    let stop_set = shared
        .observer
        .lock()
        .unwrap()
        .as_ref()
        .map(|s| s.is_stopping())
        .unwrap_or(false);

    let mut state = shared.state.lock().unwrap();
    state.received.push(Received {
        operation: request.operation(),
        stop_set,
    });

    let success = |success| (Response::Success { success }, true);

    match request {
        Request::Get { account } => {
            let value = state.balances.get(account).copied().unwrap_or(0);
            (Response::Balance { value }, true)
        }
        Request::Put { account, value } => {
            if *value < 0 {
                return success(false);
            }
            state.balances.insert(account.clone(), *value);
            state.log_length += 1;
            state.puts += 1;
            let n = state.puts;

            let deliver = !matches!(
                shared.behavior,
                Behavior::LoseEveryNthPutResponse(k) if n % k == 0
            );
            (Response::Success { success: true }, deliver)
        }
        Request::Deposit { account, value } => {
            if *value < 0 {
                return success(false);
            }
            *state.balances.entry(account.clone()).or_insert(0) += value;
            state.log_length += 1;
            success(true)
        }
        Request::Withdraw { account, value } => {
            let balance = state.balances.get(account).copied().unwrap_or(0);
            if *value < 0 || balance < *value {
                return success(false);
            }
            state.balances.insert(account.clone(), balance - value);
            state.log_length += 1;
            success(true)
        }
        Request::Transfer { from, to, value } => {
            let from_balance = state.balances.get(from).copied().unwrap_or(0);
            if *value < 0 || from_balance < *value {
                return success(false);
            }
            state.transfers += 1;
            state.log_length += 1;
            let n = state.transfers;

            match shared.behavior {
                Behavior::MintOnEveryNthTransfer(k) if n % k == 0 => {
                    *state.balances.entry(to.clone()).or_insert(0) += value;
                }
                _ => {
                    *state.balances.entry(from.clone()).or_insert(0) -= value;
                    *state.balances.entry(to.clone()).or_insert(0) += value;
                }
            }

            let deliver = !matches!(
                shared.behavior,
                Behavior::LoseEveryNthTransferResponse(k) if n % k == 0
            );
            (Response::Success { success: true }, deliver)
        }
        Request::LogLength => (
            Response::LogLength {
                value: state.log_length,
            },
            true,
        ),
    }
}
