use std::time::Duration;

use async_trait::async_trait;
use bonfire_proto::{decode_batch, encode_batch, ClientEvent, DecodedEvent};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use super::{ChatTransport, TransportError};
use crate::config::Config;

/// Path of the single request/response endpoint.
const UPDATE_PATH: &str = "/api/update";

pub struct HttpTransport {
    http: Client,
    update_url: Url,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let base: Url = config
            .server_url
            .parse()
            .map_err(|err| TransportError::InvalidUrl(format!("{}: {err}", config.server_url)))?;
        let update_url = base
            .join(UPDATE_PATH)
            .map_err(|err| TransportError::InvalidUrl(err.to_string()))?;

        // Conservative timeouts and no proxy so an unreachable local server
        // fails the tick instead of hanging it.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(4))
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self { http, update_url })
    }

    pub fn endpoint(&self) -> &Url {
        &self.update_url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn exchange(
        &self,
        outbound: &[ClientEvent],
    ) -> Result<Vec<DecodedEvent>, TransportError> {
        let body = encode_batch(outbound)?;
        let response = self
            .http
            .post(self.update_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::UnexpectedStatus { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(decode_batch(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_update_endpoint_from_the_base_url() {
        let config = Config {
            server_url: "http://127.0.0.1:9000".into(),
            ..Config::default()
        };
        let transport = HttpTransport::new(&config).expect("valid url");
        assert_eq!(transport.endpoint().as_str(), "http://127.0.0.1:9000/api/update");
    }

    #[test]
    fn rejects_an_unparseable_base_url() {
        let config = Config {
            server_url: "not a url".into(),
            ..Config::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(TransportError::InvalidUrl(_))
        ));
    }
}
