//! Single-flight session refresh.
//!
//! The first request to hit a 401 while idle starts one refresh exchange and
//! becomes the head of the waiter queue; every later 401 joins the queue.
//! When the exchange finishes the queue is drained exactly once: replayed in
//! arrival order on success, rejected as a batch (with one login redirect)
//! on failure.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiRequest, ApiResponse, AuthError, Transport, REFRESH_PATH};

use super::FailureRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

type Reply = Result<ApiResponse, ApiError>;

/// A caller blocked on the refresh, with the request to replay for it.
struct Waiter {
    request: ApiRequest,
    reply: oneshot::Sender<Reply>,
}

/// The caller's side of a queued request.
#[must_use = "the replayed response is only delivered through the handle"]
pub struct WaiterHandle {
    rx: oneshot::Receiver<Reply>,
}

impl WaiterHandle {
    /// Suspend until the refresh resolves this request.
    pub async fn wait(self) -> Reply {
        self.rx.await.unwrap_or_else(|_| Err(abandoned().into()))
    }
}

struct Inner {
    state: RefreshState,
    waiters: VecDeque<Waiter>,
    /// Callers that only want the refresh outcome, not a replay.
    observers: Vec<oneshot::Sender<Result<(), AuthError>>>,
}

impl Inner {
    /// Move to `Refreshing`. Returns true if this call made the transition.
    fn begin(&mut self) -> bool {
        match self.state {
            RefreshState::Idle => {
                self.state = RefreshState::Refreshing;
                true
            }
            RefreshState::Refreshing => false,
        }
    }
}

fn abandoned() -> AuthError {
    AuthError::RefreshFailed {
        status: None,
        message: "refresh was abandoned before completing".to_string(),
    }
}

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    router: Arc<FailureRouter>,
    inner: Mutex<Inner>,
    refreshes: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn Transport>, router: Arc<FailureRouter>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            router,
            inner: Mutex::new(Inner {
                state: RefreshState::Idle,
                waiters: VecDeque::new(),
                observers: Vec::new(),
            }),
            refreshes: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RefreshState {
        self.lock().state
    }

    pub fn is_refreshing(&self) -> bool {
        self.state() == RefreshState::Refreshing
    }

    /// Number of requests currently waiting on the refresh.
    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Total refresh exchanges started since construction.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Queue a request that just received a 401 and start a refresh if none
    /// is running. The state check, transition and enqueue happen under one
    /// lock, so two racing 401s cannot both start an exchange.
    pub fn on_auth_failure(self: &Arc<Self>, mut request: ApiRequest) -> WaiterHandle {
        request.retried = true;
        let (tx, rx) = oneshot::channel();

        let (started, position) = {
            let mut inner = self.lock();
            let started = inner.begin();
            inner.waiters.push_back(Waiter { request, reply: tx });
            (started, inner.waiters.len())
        };

        if started {
            self.spawn_refresh();
        } else {
            debug!(position = position, "Queued behind in-flight session refresh");
        }

        WaiterHandle { rx }
    }

    /// Join (or start) a refresh without queuing a request behind it.
    pub async fn refresh_now(self: &Arc<Self>) -> Result<(), AuthError> {
        let (tx, rx) = oneshot::channel();

        let started = {
            let mut inner = self.lock();
            inner.observers.push(tx);
            inner.begin()
        };

        if started {
            self.spawn_refresh();
        }

        rx.await.unwrap_or_else(|_| Err(abandoned()))
    }

    /// Runs on its own task so that a caller dropping its future cannot
    /// leave the queue stranded in `Refreshing`.
    fn spawn_refresh(self: &Arc<Self>) {
        let count = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
        info!(refresh = count, "Session expired, starting refresh");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.exchange().await;
            this.complete(outcome).await;
        });
    }

    async fn exchange(&self) -> Result<(), AuthError> {
        let request = ApiRequest::post(REFRESH_PATH);
        match self.transport.execute(&request).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(AuthError::RefreshFailed {
                status: Some(response.status()),
                message: ApiError::truncate_body(&response.text()),
            }),
            Err(e) => Err(AuthError::RefreshFailed {
                status: None,
                message: e.to_string(),
            }),
        }
    }

    async fn complete(&self, outcome: Result<(), AuthError>) {
        let (waiters, observers) = {
            let mut inner = self.lock();
            inner.state = RefreshState::Idle;
            (
                std::mem::take(&mut inner.waiters),
                std::mem::take(&mut inner.observers),
            )
        };

        for observer in observers {
            let _ = observer.send(outcome.clone());
        }

        match outcome {
            Ok(()) => {
                info!(queued = waiters.len(), "Session refreshed, replaying queued requests");
                self.replay(waiters).await;
            }
            Err(err) => {
                warn!(error = %err, queued = waiters.len(), "Session refresh failed, rejecting queued requests");
                let had_waiters = !waiters.is_empty();
                for waiter in waiters {
                    let _ = waiter.reply.send(Err(err.clone().into()));
                }
                if had_waiters {
                    self.router.redirect_to_login();
                }
            }
        }
    }

    /// Resubmit each queued request once, in arrival order. The replay's
    /// outcome goes back to its own caller as-is.
    async fn replay(&self, waiters: VecDeque<Waiter>) {
        for waiter in waiters {
            if waiter.reply.is_closed() {
                debug!(method = %waiter.request.method, path = %waiter.request.path, "Caller gone, skipping replay");
                continue;
            }
            let result = self.transport.execute(&waiter.request).await;
            if waiter.reply.send(result).is_err() {
                debug!(path = %waiter.request.path, "Caller dropped before replay finished");
            }
        }
    }
}
