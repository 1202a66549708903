//! Session orchestration: owns the poll scheduler, the outbound queue and
//! the terminal closed state.

mod ids;
mod scheduler;

pub use ids::MessageIdAllocator;
pub use scheduler::{PollScheduler, TickFlow};

use std::sync::Arc;

use bonfire_proto::{ClientEvent, LocalId};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::model::{self, CorrelationKey, LogRecord, LogStore, RecordKind};
use crate::transport::ChatTransport;

/// Author tag rendered on optimistic local echo records.
const LOCAL_AUTHOR: &str = "Us";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
}

/// Top-level orchestration of one chat session.
///
/// Created `Active` with the scheduler armed; transitions to `Closed`
/// exactly once (fatal transport failure, server-reported closure, or an
/// explicit disconnect) and never back.
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Arc<dyn ChatTransport>,
    dispatcher: Dispatcher,
    log: Arc<LogStore>,
    ids: Mutex<MessageIdAllocator>,
    outbound: Mutex<Vec<ClientEvent>>,
    state: Mutex<SessionState>,
    scheduler: Mutex<Option<PollScheduler>>,
}

impl ChatSession {
    pub fn start(transport: Arc<dyn ChatTransport>, log: Arc<LogStore>, config: &Config) -> Self {
        let inner = Arc::new(SessionInner {
            transport,
            dispatcher: Dispatcher::new(log.clone()),
            log,
            ids: Mutex::new(MessageIdAllocator::new()),
            outbound: Mutex::new(Vec::new()),
            state: Mutex::new(SessionState::Active),
            scheduler: Mutex::new(None),
        });

        // The tick closure holds a weak handle so a dropped session lets the
        // scheduler task wind itself down.
        let weak = Arc::downgrade(&inner);
        let scheduler = PollScheduler::start(config.poll_interval, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.poll_tick().await,
                    None => TickFlow::Stop,
                }
            }
        });
        *inner.scheduler.lock() = Some(scheduler);

        Self { inner }
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    /// Queues one chat message and exchanges it immediately rather than
    /// waiting for the next scheduled tick. The local echo record, keyed
    /// `Us{id}`, is rendered before the exchange so the confirmation in the
    /// very next response already has its record.
    pub async fn send_message(&self, text: &str) -> Result<LocalId, SessionError> {
        if self.inner.is_closed() {
            return Err(SessionError::Closed);
        }
        let id = self.inner.ids.lock().next();
        self.inner.log.append(LogRecord::message(
            CorrelationKey::local(id),
            model::now_ms(),
            LOCAL_AUTHOR,
            text,
        ));
        self.inner
            .outbound
            .lock()
            .push(ClientEvent::SendMessage {
                id,
                message: text.to_string(),
            });
        self.inner.run_exchange().await;
        Ok(id)
    }

    /// Announces the disconnect to the server, renders the closed notice,
    /// and transitions to `Closed`. A no-op on an already-closed session.
    pub async fn disconnect(&self) {
        if self.inner.is_closed() {
            return;
        }
        self.inner.outbound.lock().push(ClientEvent::Disconnect);
        self.inner.run_exchange().await;
        self.inner
            .log
            .append(LogRecord::notice(RecordKind::Closed, "Closed connection"));
        self.inner.close();
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl SessionInner {
    fn is_closed(&self) -> bool {
        *self.state.lock() == SessionState::Closed
    }

    fn drain_outbound(&self) -> Vec<ClientEvent> {
        std::mem::take(&mut *self.outbound.lock())
    }

    /// One scheduled sync tick.
    async fn poll_tick(self: Arc<Self>) -> TickFlow {
        if self.is_closed() {
            return TickFlow::Stop;
        }
        self.run_exchange().await;
        if self.is_closed() {
            TickFlow::Stop
        } else {
            TickFlow::Continue
        }
    }

    /// One request/response exchange carrying whatever is queued. Inbound
    /// events are dispatched in received order; a transport failure is
    /// fatal to the session and never retried.
    async fn run_exchange(&self) {
        if self.is_closed() {
            return;
        }
        let outbound = self.drain_outbound();
        match self.transport.exchange(&outbound).await {
            Ok(batch) => {
                for event in batch {
                    if self.dispatcher.dispatch(event) == DispatchOutcome::CloseSession {
                        self.close();
                    }
                }
            }
            Err(err) => {
                warn!(
                    target = "chat.session",
                    error = %err,
                    "exchange failed, stopping the sync cycle"
                );
                self.log.append(LogRecord::notice(
                    RecordKind::Error,
                    format!("Error: {err} (connection closed)"),
                ));
                self.close();
            }
        }
    }

    /// Terminal transition; only the first call has any effect.
    fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == SessionState::Closed {
                return;
            }
            *state = SessionState::Closed;
        }
        if let Some(scheduler) = self.scheduler.lock().take() {
            scheduler.stop();
        }
        debug!(target = "chat.session", "session closed");
    }
}
