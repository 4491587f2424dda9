//! HTTP calls against the coordination service

use thiserror::Error;

use crate::model::{Registration, Snapshot};

/// Client error
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("push channel {url} failed: {source}")]
    WebSocket {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    #[error("invalid snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("push channel closed")]
    Closed,
}

/// Client of the coordination service HTTP API
#[derive(Debug, Clone)]
pub struct ConfigClient {
    http: reqwest::Client,
    base: String,
}

impl ConfigClient {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL of the snapshot push channel
    pub fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", self.base)
        };
        format!("{}/ws/config", base)
    }

    /// Current snapshot
    pub async fn fetch_config(&self) -> Result<Snapshot, ClientError> {
        self.get_snapshot(format!("{}/config", self.base)).await
    }

    /// Snapshot after the next state change
    pub async fn wait_config(&self) -> Result<Snapshot, ClientError> {
        self.get_snapshot(format!("{}/config?wait", self.base)).await
    }

    async fn get_snapshot(&self, url: String) -> Result<Snapshot, ClientError> {
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                url: url.clone(),
                source,
            })?;
        let response = check_status(&url, response).await?;

        response
            .json()
            .await
            .map_err(|source| ClientError::Http { url, source })
    }

    /// Heartbeat ping; returns the id the service knows the entity by
    pub async fn ping(&self, registration: &Registration) -> Result<String, ClientError> {
        let url = format!("{}/ping/{}", self.base, registration.kind());
        let request = self.http.post(&url);
        let request = match registration {
            Registration::Relay(relay) => request.json(relay),
            Registration::Receiver(receiver) => request.json(receiver),
        };

        let response = request.send().await.map_err(|source| ClientError::Http {
            url: url.clone(),
            source,
        })?;
        let response = check_status(&url, response).await?;

        response
            .json()
            .await
            .map_err(|source| ClientError::Http { url, source })
    }
}

async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Radio, ReceiverId, ReceiverRegistration};
    use crate::server::listener::testing::TestServer;

    #[test]
    fn test_ws_url() {
        assert_eq!(
            ConfigClient::new("http://mesh:8080/").ws_url(),
            "ws://mesh:8080/ws/config"
        );
        assert_eq!(
            ConfigClient::new("https://mesh").ws_url(),
            "wss://mesh/ws/config"
        );
    }

    #[tokio::test]
    async fn test_fetch_and_ping() {
        let server = TestServer::start().await;
        let client = ConfigClient::new(server.url(""));

        let id = client
            .ping(&Registration::Receiver(ReceiverRegistration {
                name: "kitchen".into(),
                host: "pi".into(),
                volume: Some(300),
            }))
            .await
            .unwrap();
        assert_eq!(id, "receiver-kitchen");

        let snapshot = client.fetch_config().await.unwrap();
        assert_eq!(snapshot.receiver(&ReceiverId::from_name("kitchen")).unwrap().volume, 300);
    }

    #[tokio::test]
    async fn test_wait_config() {
        let server = TestServer::start().await;
        let client = ConfigClient::new(server.url(""));

        let waiting = tokio::spawn(async move { client.wait_config().await });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        server.store.add_radio(Radio::new("Test", "test")).await.unwrap();

        let snapshot = waiting.await.unwrap().unwrap();
        assert_eq!(snapshot.radios.len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_ping() {
        let server = TestServer::start().await;
        let client = ConfigClient::new(server.url(""));

        let result = client
            .ping(&Registration::Receiver(ReceiverRegistration {
                name: "kitchen".into(),
                host: "pi".into(),
                volume: Some(5000),
            }))
            .await;

        assert!(matches!(result, Err(ClientError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = ConfigClient::new(format!("http://{}", addr)).fetch_config().await;

        assert!(matches!(result, Err(ClientError::Http { .. })));
    }
}
