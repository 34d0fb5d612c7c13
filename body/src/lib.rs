//! Reading and writing HTTP/1.x message bodies under each
//! [`FramingMode`].
//!
//! [`BodyReader`] is the framing state machine: it is created with the mode
//! chosen from the response head, reads exactly the bytes that mode calls
//! for, and reports any shortfall as a [`BodyError`] carrying byte counts.
//!
//! ```rust
//! use bodycheck_body::{BodyError, BodyReader};
//! use bodycheck_http_message::framing::FramingMode;
//! use bytes::BytesMut;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // the server promised 10 bytes but closed after 6
//!     let input = b"123456";
//!     let reader = BodyReader::new(&input[..], BytesMut::new(), FramingMode::FixedLength(10));
//!     let err = reader.collect(1024).await.unwrap_err();
//!     assert!(matches!(err, BodyError::IncompleteBody { expected: 10, actual: 6 }));
//! }
//! ```

mod chunked;
mod parse_trailers;
mod writer;

pub use parse_trailers::TrailerError;
pub use writer::{BodyWriter, ChunkedBodyWriter, ContentLengthBodyWriter};

use std::time::Duration;

use bodycheck_http_message::framing::FramingMode;
use bodycheck_util::buffer::Buffer;
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::chunked::ChunkDecoder;

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Attempted to handle more than the maximum allowed bytes: {0}")]
    BodyOverflow(u64),
    #[error("Could not write body: {0}")]
    BodyWriteError(std::io::Error),
    #[error("Could not read body: {0}")]
    BodyReadError(std::io::Error),
    #[error("Body expected {expected} bytes, but only has {actual} bytes")]
    IncompleteBody { expected: u64, actual: u64 },
    #[error("Body read timed out after {actual} bytes")]
    Interrupted { actual: u64 },
    #[error("Chunk declared {declared} bytes, but only {available} were available: {fault}")]
    ChunkFraming {
        declared: u64,
        available: u64,
        /// payload bytes received across every chunk, including `available`
        received: u64,
        fault: ChunkFault,
    },
}

pub type BodyResult<T> = Result<T, BodyError>;

/// Which obligation of the chunked encoding was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFault {
    /// The stream ended (or stalled) before a chunk, its CRLF, or the
    /// terminal chunk arrived.
    Truncated,
    /// A chunk-size line was not a hexadecimal size.
    InvalidSize,
    /// The bytes after a chunk's payload were not CRLF.
    InvalidFooter,
    /// The trailer section after the terminal chunk was malformed.
    InvalidTrailer,
}

impl std::fmt::Display for ChunkFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Truncated => "truncated chunk",
            Self::InvalidSize => "invalid chunk size",
            Self::InvalidFooter => "invalid chunk footer",
            Self::InvalidTrailer => "invalid trailers",
        })
    }
}

/// Why the stream stopped delivering bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interruption {
    Closed,
    TimedOut,
}

/// How far a [`BodyReader`] has gotten. Available at any point, including
/// after a read has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub mode: FramingMode,
    /// body bytes handed out so far (chunk payload only, for chunked bodies)
    pub body_bytes: u64,
    /// the chunk currently being read, if any
    pub chunk: Option<ChunkProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub declared: u64,
    pub read: u64,
}

#[derive(Debug)]
enum BodyReadResult {
    NeedRead,
    DidRead(Bytes),
    Complete,
}

#[derive(Debug)]
struct FixedLengthReader {
    /// the total body length specified by the content-length header.
    length: u64,
    /// the amount of the body already read
    offset: u64,
}

impl FixedLengthReader {
    fn read_bytes(&mut self, max_len: usize, buffer: &mut Buffer) -> BodyReadResult {
        let remaining = self.remaining();
        if remaining == 0 {
            return BodyReadResult::Complete;
        }
        if buffer.is_empty() {
            return BodyReadResult::NeedRead;
        }

        let at = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(buffer.len())
            .min(max_len);
        self.offset += at as u64;
        BodyReadResult::DidRead(buffer.split_to(at).freeze())
    }

    fn remaining(&self) -> u64 {
        debug_assert!(self.offset <= self.length);
        self.length - self.offset
    }
}

#[derive(Debug, Default)]
struct UntilCloseReader {
    offset: u64,
    closed: bool,
}

impl UntilCloseReader {
    fn read_bytes(&mut self, max_len: usize, buffer: &mut Buffer) -> BodyReadResult {
        if buffer.is_empty() {
            return if self.closed {
                BodyReadResult::Complete
            } else {
                BodyReadResult::NeedRead
            };
        }
        let at = buffer.len().min(max_len);
        self.offset += at as u64;
        BodyReadResult::DidRead(buffer.split_to(at).freeze())
    }
}

#[derive(Debug)]
enum BodyReaderState {
    FixedLength(FixedLengthReader),
    Chunked(ChunkDecoder),
    UntilClose(UntilCloseReader),
}

impl BodyReaderState {
    fn new(mode: FramingMode) -> Self {
        match mode {
            FramingMode::FixedLength(length) => {
                Self::FixedLength(FixedLengthReader { length, offset: 0 })
            }
            FramingMode::Chunked => Self::Chunked(ChunkDecoder::new()),
            FramingMode::UntilClose => Self::UntilClose(UntilCloseReader::default()),
        }
    }

    fn read_bytes(&mut self, max_len: usize, buffer: &mut Buffer) -> BodyResult<BodyReadResult> {
        match self {
            Self::FixedLength(r) => Ok(r.read_bytes(max_len, buffer)),
            Self::Chunked(r) => r.read_bytes(max_len, buffer),
            Self::UntilClose(r) => Ok(r.read_bytes(max_len, buffer)),
        }
    }

    /// How much to ask the stream for. A fixed-length body never reads past
    /// its end, so whatever follows it stays in the stream.
    fn read_hint(&self, default: usize) -> usize {
        match self {
            Self::FixedLength(r) => usize::try_from(r.remaining())
                .unwrap_or(usize::MAX)
                .min(default),
            Self::Chunked(_) | Self::UntilClose(_) => default,
        }
    }

    /// The stream stopped delivering bytes. Only a close while reading until
    /// close ends the body normally.
    fn interrupt(&mut self, cause: Interruption) -> BodyResult<()> {
        match self {
            Self::FixedLength(r) => Err(BodyError::IncompleteBody {
                expected: r.length,
                actual: r.offset,
            }),
            Self::Chunked(r) => Err(r.interrupted()),
            Self::UntilClose(r) => match cause {
                Interruption::Closed => {
                    r.closed = true;
                    Ok(())
                }
                Interruption::TimedOut => Err(BodyError::Interrupted { actual: r.offset }),
            },
        }
    }

    fn mode(&self) -> FramingMode {
        match self {
            Self::FixedLength(r) => FramingMode::FixedLength(r.length),
            Self::Chunked(_) => FramingMode::Chunked,
            Self::UntilClose(_) => FramingMode::UntilClose,
        }
    }

    fn progress(&self) -> Progress {
        let (body_bytes, chunk) = match self {
            Self::FixedLength(r) => (r.offset, None),
            Self::Chunked(r) => (r.body_bytes(), r.chunk()),
            Self::UntilClose(r) => (r.offset, None),
        };
        Progress {
            mode: self.mode(),
            body_bytes,
            chunk,
        }
    }
}

/// The result of reading a body to its end.
#[derive(Debug)]
pub struct Collected<I> {
    /// The body exactly as framed on the wire, before any content-coding is
    /// reversed.
    pub raw: Bytes,
    /// The stream, positioned after the body.
    pub io: I,
    /// Bytes already read off the stream that follow the body.
    pub leftover: BytesMut,
}

pub struct BodyReader<I> {
    io: I,
    buffer: Buffer,
    state: BodyReaderState,
    read_timeout: Option<Duration>,
}

impl<I> BodyReader<I> {
    pub fn mode(&self) -> FramingMode {
        self.state.mode()
    }

    pub fn progress(&self) -> Progress {
        self.state.progress()
    }
}

impl<I: AsyncReadExt + Unpin> BodyReader<I> {
    const CHUNK_READ_LEN: usize = 8 * 1024;

    /// `buffer` holds body bytes that were read along with the head.
    pub fn new(io: I, buffer: BytesMut, mode: FramingMode) -> Self {
        Self {
            io,
            buffer: Buffer::new(buffer),
            state: BodyReaderState::new(mode),
            read_timeout: None,
        }
    }

    /// Give up when a single read waits longer than `read_timeout`.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Read at most `max_len` body bytes. `Ok(None)` means the body is
    /// complete.
    pub async fn read(&mut self, max_len: usize) -> BodyResult<Option<Bytes>> {
        debug_assert!(max_len > 0, "a zero-length read can never make progress");
        loop {
            match self.state.read_bytes(max_len, &mut self.buffer)? {
                BodyReadResult::DidRead(bytes) => return Ok(Some(bytes)),
                BodyReadResult::Complete => return Ok(None),
                BodyReadResult::NeedRead => {
                    if let Some(cause) = self.fill().await? {
                        debug!(?cause, progress = ?self.progress(), "body stream interrupted");
                        self.state.interrupt(cause)?;
                    }
                }
            }
        }
    }

    /// Pull more bytes off the stream. Returns the reason if none arrived.
    async fn fill(&mut self) -> BodyResult<Option<Interruption>> {
        let target_read_len = self.state.read_hint(Self::CHUNK_READ_LEN);
        let read = self.buffer.read_from(&mut self.io, target_read_len);
        let len = match self.read_timeout {
            None => read.await,
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(res) => res,
                Err(_elapsed) => return Ok(Some(Interruption::TimedOut)),
            },
        }
        .map_err(BodyError::BodyReadError)?;
        Ok((len == 0).then_some(Interruption::Closed))
    }

    /// Read the whole body, refusing to hold more than `max_body_length`
    /// bytes. Only bytes that actually arrive count against the limit, so a
    /// declared length above it can still end as [`BodyError::IncompleteBody`].
    pub async fn collect(mut self, max_body_length: u64) -> BodyResult<Collected<I>> {
        let mode = self.mode();
        let initial = mode
            .declared_length()
            .unwrap_or(0)
            .min(Self::CHUNK_READ_LEN as u64 * 8);
        let mut raw = BytesMut::with_capacity(initial as usize);
        while let Some(bytes) = self.read(Self::CHUNK_READ_LEN).await? {
            if raw.len() as u64 + bytes.len() as u64 > max_body_length {
                return Err(BodyError::BodyOverflow(max_body_length));
            }
            raw.extend_from_slice(&bytes);
        }
        debug!(%mode, len = raw.len(), "body complete");

        let Self { io, buffer, .. } = self;
        Ok(Collected {
            raw: raw.freeze(),
            io,
            leftover: buffer.into_inner(),
        })
    }
}
