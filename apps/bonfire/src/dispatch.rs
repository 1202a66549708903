//! Maps each decoded inbound event to its effect on the rendered log.

use std::sync::Arc;

use bonfire_proto::{round_trip_display, timestamp_ms, DecodedEvent, ServerEvent};
use tracing::warn;

use crate::model::{CorrelationKey, LogRecord, LogStore, RecordKind};

/// What the session controller should do after one event is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    CloseSession,
}

/// Stateless apart from a shared handle to the record store; never owns the
/// records it touches.
#[derive(Clone)]
pub struct Dispatcher {
    log: Arc<LogStore>,
}

impl Dispatcher {
    pub fn new(log: Arc<LogStore>) -> Self {
        Self { log }
    }

    pub fn dispatch(&self, event: DecodedEvent) -> DispatchOutcome {
        match event {
            Ok(ServerEvent::Message {
                time,
                author,
                id,
                contents,
            }) => {
                let key = CorrelationKey::remote(&author, &id);
                self.log
                    .append(LogRecord::message(key, timestamp_ms(time), author, contents));
                DispatchOutcome::Continue
            }
            Ok(ServerEvent::ConnectionError { detail }) => {
                self.log.append(LogRecord::notice(
                    RecordKind::Error,
                    format!("Error: {detail} (connection closed)"),
                ));
                DispatchOutcome::CloseSession
            }
            Ok(ServerEvent::ConnectionWarning { detail }) => {
                self.log.append(LogRecord::notice(
                    RecordKind::Warning,
                    format!("Warning: {detail}"),
                ));
                DispatchOutcome::Continue
            }
            Ok(ServerEvent::ConnectionClosed) => {
                self.log.append(LogRecord::notice(
                    RecordKind::Closed,
                    "Remote connection closed",
                ));
                DispatchOutcome::CloseSession
            }
            Ok(ServerEvent::MessageConfirmation { id, time_delta }) => {
                let key = CorrelationKey::local_from_value(&id);
                let display = round_trip_display(time_delta);
                if !self.log.set_round_trip(&key, &display) {
                    // Late or duplicate confirmation; the record it refers
                    // to was never created.
                    warn!(
                        target = "chat.dispatch",
                        key = %key,
                        "confirmation without a matching record"
                    );
                }
                DispatchOutcome::Continue
            }
            Err(err) => {
                warn!(
                    target = "chat.dispatch",
                    error = %err,
                    "skipping undecodable event"
                );
                DispatchOutcome::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bonfire_proto::WireError;
    use serde_json::json;

    fn dispatcher() -> (Dispatcher, Arc<LogStore>) {
        let log = Arc::new(LogStore::new());
        (Dispatcher::new(log.clone()), log)
    }

    #[test]
    fn message_renders_a_keyed_record() {
        let (dispatcher, log) = dispatcher();
        let outcome = dispatcher.dispatch(Ok(ServerEvent::Message {
            time: 1_700_000_000.0,
            author: "Bob".into(),
            id: json!(42),
            contents: "hi".into(),
        }));

        assert_eq!(outcome, DispatchOutcome::Continue);
        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, Some(CorrelationKey::remote("Bob", &json!(42))));
        assert_eq!(records[0].key.as_ref().unwrap().as_str(), "Bob42");
        assert_eq!(records[0].author.as_deref(), Some("Bob"));
        assert_eq!(records[0].contents, "hi");
        assert_eq!(records[0].timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn confirmation_updates_only_the_matching_record() {
        let (dispatcher, log) = dispatcher();
        log.append(LogRecord::message(CorrelationKey::local(1), 0, "Us", "one"));
        log.append(LogRecord::message(CorrelationKey::local(2), 0, "Us", "two"));

        let outcome = dispatcher.dispatch(Ok(ServerEvent::MessageConfirmation {
            id: json!(1),
            time_delta: 1500,
        }));

        assert_eq!(outcome, DispatchOutcome::Continue);
        let records = log.records();
        assert_eq!(records[0].round_trip.as_deref(), Some("1.5"));
        assert_eq!(records[1].round_trip, None);
    }

    #[test]
    fn unmatched_confirmation_is_not_fatal_and_renders_nothing() {
        let (dispatcher, log) = dispatcher();
        let outcome = dispatcher.dispatch(Ok(ServerEvent::MessageConfirmation {
            id: json!(9),
            time_delta: 1500,
        }));
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert!(log.is_empty());
    }

    #[test]
    fn connection_error_renders_and_requests_close() {
        let (dispatcher, log) = dispatcher();
        let outcome = dispatcher.dispatch(Ok(ServerEvent::ConnectionError {
            detail: "kicked".into(),
        }));
        assert_eq!(outcome, DispatchOutcome::CloseSession);
        let records = log.records();
        assert_eq!(records[0].kind, RecordKind::Error);
        assert_eq!(records[0].contents, "Error: kicked (connection closed)");
    }

    #[test]
    fn connection_warning_keeps_the_session_active() {
        let (dispatcher, log) = dispatcher();
        let outcome = dispatcher.dispatch(Ok(ServerEvent::ConnectionWarning {
            detail: "lossy link".into(),
        }));
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(log.records()[0].contents, "Warning: lossy link");
    }

    #[test]
    fn connection_closed_renders_and_requests_close() {
        let (dispatcher, log) = dispatcher();
        let outcome = dispatcher.dispatch(Ok(ServerEvent::ConnectionClosed));
        assert_eq!(outcome, DispatchOutcome::CloseSession);
        assert_eq!(log.records()[0].contents, "Remote connection closed");
        assert_eq!(log.records()[0].kind, RecordKind::Closed);
    }

    #[test]
    fn undecodable_event_renders_nothing_and_continues() {
        let (dispatcher, log) = dispatcher();
        let outcome = dispatcher.dispatch(Err(WireError::UnknownEventType("bogus".into())));
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert!(log.is_empty());
    }
}
