use std::time::Duration;

use bodycheck_body::BodyError;
use bodycheck_http_message::{header::HeaderError, message::MessageError};
use tokio::io;

/// Why a response head could not be read. Each of these becomes a
/// `HeaderParseError` verdict rather than a failure of the check itself.
#[derive(Debug, thiserror::Error)]
pub enum HeadError {
    #[error("Connection closed before any response bytes arrived")]
    ClosedBeforeResponse,
    #[error("Unexpected end of file while reading response head")]
    UnexpectedEof,
    #[error("Failed to parse response: {0}")]
    Parse(MessageError),
    #[error("Header error: {0}")]
    Header(#[from] HeaderError),
    #[error("Response head exceeded size limit: {0} >= {1}")]
    MaxHeadLenExceeded(usize, usize),
    #[error("Timed out after {0:?} waiting for response head")]
    TimedOut(Duration),
    #[error("101-switching-protocols unsupported")]
    SwitchingProtocols,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to connect: {0}")]
    ConnectError(io::Error),
    #[error("Failed to write request: {0}")]
    WriteError(io::Error),
    #[error("Failed to read response: {0}")]
    ReadError(io::Error),
    #[error("Failed to read body: {0}")]
    BodyReadError(BodyError),
    #[error(transparent)]
    Head(#[from] HeadError),
}

pub type ClientResult<T> = Result<T, ClientError>;
