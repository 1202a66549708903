//! One request/response exchange per sync tick, behind a trait so tests can
//! script the server side.

mod http;
pub mod mock;

pub use http::HttpTransport;

use async_trait::async_trait;
use bonfire_proto::{ClientEvent, DecodedEvent, WireError};
use thiserror::Error;

/// Any of these is fatal to the session that sees it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("undecodable response: {0}")]
    Codec(#[from] WireError),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Carries the queued outbound events to the server and returns the
    /// decoded inbound batch in the order the server sent it.
    async fn exchange(&self, outbound: &[ClientEvent])
        -> Result<Vec<DecodedEvent>, TransportError>;
}
