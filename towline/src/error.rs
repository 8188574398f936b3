use thiserror::Error;

/// Outcome of one finished transfer, recorded on the connection and passed
/// to its finish callback.
pub type TransferResult = Result<(), TransferError>;

/// Per-transfer failure kinds reported by the transfer engine.
///
/// These are values, not faults: the driver relays them through the
/// exactly-once finish notification and never raises an error of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The URL scheme is not supported by the engine.
    #[error("unsupported protocol")]
    UnsupportedProtocol,
    /// The URL could not be parsed.
    #[error("malformed URL")]
    BadUrl,
    /// Host name resolution failed.
    #[error("could not resolve host")]
    HostResolution,
    /// The remote peer could not be reached.
    #[error("connect failed")]
    ConnectFailed,
    /// TLS handshake or certificate verification failed.
    #[error("TLS handshake failed")]
    TlsHandshake,
    /// The socket factory failed to open a socket.
    #[error("could not open socket")]
    SocketOpenFailed,
    /// A configured timeout elapsed before the transfer finished.
    #[error("transfer timed out")]
    TimedOut,
    /// A data callback returned failure.
    #[error("aborted by callback")]
    AbortedByCallback,
    /// Sending request data failed.
    #[error("send failed")]
    SendFailed,
    /// Receiving response data failed.
    #[error("recv failed")]
    RecvFailed,
    /// The peer violated the wire protocol.
    #[error("protocol error")]
    Protocol,
}
