//! Scripted transport used by unit and integration tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use bonfire_proto::{ClientEvent, DecodedEvent};
use parking_lot::Mutex;

use super::{ChatTransport, TransportError};

/// Replays scripted exchange results and records every outbound batch it
/// was handed. When the script runs dry, exchanges succeed with an empty
/// batch.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<Vec<DecodedEvent>, TransportError>>>,
    sent: Mutex<Vec<Vec<ClientEvent>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result for the next exchange.
    pub fn enqueue(&self, result: Result<Vec<DecodedEvent>, TransportError>) {
        self.script.lock().push_back(result);
    }

    /// Every outbound batch seen so far, in call order.
    pub fn sent(&self) -> Vec<Vec<ClientEvent>> {
        self.sent.lock().clone()
    }

    pub fn exchange_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn exchange(
        &self,
        outbound: &[ClientEvent],
    ) -> Result<Vec<DecodedEvent>, TransportError> {
        self.sent.lock().push(outbound.to_vec());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
