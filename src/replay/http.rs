use std::time::Duration;

use reqwest::{Client, Method, header::CONTENT_TYPE as CONTENT_TYPE_HEADER};

use crate::{config::{ConfigError, SyncConfig}, types::ActionMethod};

use super::{CONTENT_TYPE, ReplayRequest, Transport, TransportError};

/// Replays actions with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(config: &SyncConfig) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &SyncConfig) -> Self {
        Self {
            http,
            timeout: config.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ReplayRequest) -> Result<u16, TransportError> {
        let mut builder = self
            .http
            .request(http_method(request.method), request.url)
            .header(CONTENT_TYPE_HEADER, CONTENT_TYPE);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        Ok(response.status().as_u16())
    }
}

fn http_method(method: ActionMethod) -> Method {
    match method {
        ActionMethod::Create => Method::POST,
        ActionMethod::Update => Method::PATCH,
        ActionMethod::Delete => Method::DELETE,
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}
