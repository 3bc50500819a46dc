use std::fmt::{Display, Formatter};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A traceflow error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A traceflow error.
#[derive(Error, Debug)]
pub enum Error {
    /// A probe is missing a required field or has an invalid one.
    #[error("invalid config: {0}")]
    BadConfig(String),
    /// A recognised but unimplemented feature was requested.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// A captured packet was too short to decode.
    #[error("invalid packet: {0}")]
    PacketError(#[from] traceflow_packet::error::Error),
    #[error("path {path} and hop {hop} must both fit in 8 bits")]
    IdentifierOutOfRange { path: u16, hop: u16 },
    #[error("requires elevated privilege: {0}")]
    PermissionDenied(IoError),
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("probe failed to send: {0}")]
    ProbeFailed(IoError),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("unknown interface: {0}")]
    UnknownInterface(String),
    #[error("missing address from socket call")]
    MissingAddr,
    #[error("traceflow error: {0}")]
    Other(String),
}

impl Error {
    /// Classify a failure to create a raw socket.
    pub(crate) fn from_raw_socket(err: IoError) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(err)
        } else {
            Self::IoError(err)
        }
    }
}

/// Custom IO error result.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// An IO error annotated with the failed operation.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("connect error for {1}: {0}")]
    Connect(io::Error, SocketAddr),
    #[error("sendto error for {1}: {0}")]
    SendTo(io::Error, SocketAddr),
    #[error("failed to {1}: {0}")]
    Other(io::Error, IoOperation),
}

impl IoError {
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Connect(err, _) | Self::SendTo(err, _) | Self::Other(err, _) => err.kind(),
        }
    }

    /// The error is a read timing out rather than a real failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
        )
    }
}

/// Io operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IoOperation {
    NewSocket,
    SetHeaderIncluded,
    SetReadTimeout,
    RecvFrom,
    LocalAddr,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create new socket"),
            Self::SetHeaderIncluded => write!(f, "set header included"),
            Self::SetReadTimeout => write!(f, "set read timeout"),
            Self::RecvFrom => write!(f, "recv from"),
            Self::LocalAddr => write!(f, "local addr"),
        }
    }
}
