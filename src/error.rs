//! Error types for the Q IPC protocol.

/// Errors that can occur during Q IPC operations.
#[derive(Debug, thiserror::Error)]
pub enum KxError {
    /// The 8-octet frame header failed validation. The stream position is
    /// unrecoverable; callers should close the connection.
    #[error("bad header")]
    BadHeader,

    #[error("bad message: {0}")]
    BadMessage(String),

    /// A type code the decoder refuses (dynamic load, 112).
    #[error("unsupported type: {0}")]
    Unsupported(String),

    /// An error atom (type -128) received from the peer.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    /// Reply sent by a server that does not accept sync requests.
    #[error("nosyncrequest")]
    NoSyncRequest,

    #[error("{0}")]
    Deserialize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
