//! Per-transfer configuration.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

/// Credentials for an authenticated proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

/// Abort threshold for slow transfers: average speed below `bytes_per_sec`
/// for `duration` fails the transfer with a timeout result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowSpeedLimit {
    pub bytes_per_sec: u64,
    pub duration: Duration,
}

/// Snapshot of one transfer's configuration, consumed by the engine at
/// registration. Mutated through [`Connection`](crate::Connection) setters;
/// immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Target URL.
    pub url: String,
    /// Ask the engine to emit detail about the transfer.
    pub verbose: bool,
    /// Proxy URL, if any.
    pub proxy: Option<String>,
    pub proxy_credentials: Option<ProxyCredentials>,
    /// Connect to the peer without transferring any data.
    pub connect_only: bool,
    /// Verify the peer's TLS certificate.
    pub verify_certificate: bool,
    /// Verify the certificate's name against the host.
    pub verify_host: bool,
    /// File holding certificates to verify the peer with.
    pub ca_file: Option<PathBuf>,
    /// Request body for the default in-memory body source. Ignored when a
    /// read-body callback is set on the connection.
    pub request_body: Bytes,
    /// Whether a response body is expected. Must be false for responses
    /// without a body, otherwise the transfer stalls waiting for one.
    pub receive_body: bool,
    /// Enable the progress meter. When disabled the progress callback is
    /// never invoked.
    pub enable_progress: bool,
    /// Timeout for the connect phase. `None` selects the engine default.
    pub connect_timeout: Option<Duration>,
    /// Timeout for the whole transfer. `None` means no timeout.
    pub total_timeout: Option<Duration>,
    /// Low-speed abort threshold. `None` means no threshold.
    pub low_speed_limit: Option<LowSpeedLimit>,
    /// Raw protocol header lines (e.g. `accept: text/plain`), without line
    /// endings.
    pub request_headers: Vec<String>,
    /// Issue a POST-style request.
    pub use_post: bool,
    /// Follow redirect responses automatically.
    pub follow_redirects: bool,
    /// Upper bound on followed redirects. `None` means unlimited.
    pub max_redirects: Option<u32>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            verbose: false,
            proxy: None,
            proxy_credentials: None,
            connect_only: false,
            verify_certificate: true,
            verify_host: true,
            ca_file: None,
            request_body: Bytes::new(),
            receive_body: true,
            enable_progress: false,
            connect_timeout: None,
            total_timeout: None,
            low_speed_limit: None,
            request_headers: Vec::new(),
            use_post: false,
            follow_redirects: false,
            max_redirects: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_verify_tls_and_receive_body() {
        let options = TransferOptions::default();
        assert!(options.verify_certificate);
        assert!(options.verify_host);
        assert!(options.receive_body);
        assert!(!options.use_post);
        assert!(options.request_body.is_empty());
    }
}
