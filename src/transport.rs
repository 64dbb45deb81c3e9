//! Request/response transport to the smart plug.
//!
//! The power provider only needs `request(method, payload) -> bytes`; the
//! [`Transport`] trait captures that so the poll loop can be tested with a
//! scripted fake.
//!
//! [`HttpTransport`] speaks a relay protocol, not the plug's own API: it posts
//! the plain JSON payload to `http://<host>/app/<method>` with basic
//! credentials. Tapo plugs do not serve that endpoint themselves; they only
//! accept requests after the encrypted KLAP handshake. `host` must therefore
//! point at a relay that performs the handshake and forwards the request to
//! the plug. A native KLAP client would be another [`Transport`].

use crate::config::TapoConfig;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors returned by a transport. None of them are fatal to the caller.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("device unreachable: {0}")]
    Unreachable(String),
}

/// Boxed future returned by [`Transport::request`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<u8>, TransportError>> + Send + 'a>>;

/// A request/response channel to a remote device.
pub trait Transport: Send + Sync {
    fn request<'a>(&'a self, method: &'a str, payload: &'a [u8]) -> TransportFuture<'a>;
}

/// JSON-over-HTTP transport with basic authentication.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl HttpTransport {
    pub fn new(config: &TapoConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("http://{}/app", config.host),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }
}

impl Transport for HttpTransport {
    fn request<'a>(&'a self, method: &'a str, payload: &'a [u8]) -> TransportFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(method))
                .basic_auth(&self.user, Some(&self.password))
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_vec())
                .send()
                .await?
                .error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(host: &str) -> TapoConfig {
        TapoConfig {
            host: host.to_string(),
            user: "me".to_string(),
            password: "secret".to_string(),
            name: "taller".to_string(),
            poll_interval: Duration::from_secs(15),
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn builds_request_url_from_host() {
        let transport = HttpTransport::new(&config("192.168.1.40")).unwrap();
        assert_eq!(transport.url("request"), "http://192.168.1.40/app/request");
    }

    #[tokio::test]
    async fn connection_failure_is_an_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let transport = HttpTransport::new(&config("127.0.0.1:9")).unwrap();
        let result = transport.request("request", b"{}").await;
        assert!(matches!(result, Err(TransportError::Http(_))));
    }
}
