use bodycheck_body::BodyError;
use bodycheck_http_message::message::MessageError;
use tokio::io;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Failed to bind listener: {0}")]
    BindError(io::Error),
    #[error("Failed to accept connection: {0}")]
    AcceptError(io::Error),
    #[error("Failed to read request: {0}")]
    ReadError(io::Error),
    #[error("Failed to write response: {0}")]
    WriteError(io::Error),
    #[error("Failed to write body: {0}")]
    BodyWriteError(BodyError),
    #[error("Connection closed before any request bytes arrived")]
    FirstReadEOF,
    #[error("Unexpected end of file while reading")]
    UnexpectedEOF,
    #[error("Failed to parse request: {0}")]
    HttpRequestParseError(MessageError),
    #[error("Request head exceeded size limit: {0} >= {1}")]
    MaxHeadLenExceeded(usize, usize),
    #[error("Unknown fixture: {0}")]
    UnknownFixture(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
