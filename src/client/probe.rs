//! Relay reachability probe

use std::time::Duration;

use tokio::net::TcpStream;

/// Whether a TCP connection to `host:port` opens within `timeout`
pub async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::debug!(host, port, error = %e, "Relay not reachable");
            false
        }
        Err(_) => {
            tracing::debug!(host, port, "Relay probe timed out");
            false
        }
    }
}
