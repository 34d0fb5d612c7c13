use std::str::FromStr;

use bodycheck_http_message::message::ResponseBuilder;
use tokio::io::AsyncWriteExt;

use crate::{
    error::{HarnessError, HarnessResult},
    writer::ResponseWriter,
};

/// `hello`, gzip-compressed (25 bytes).
pub const GZIP_HELLO: &[u8] =
    b"\x1f\x8b\x08\x00\xc9)\xdcZ\x00\x03\xcbH\xcd\xc9\xc9\x07\x00\x86\xa6\x106\x05\x00\x00\x00";

/// `content-length: 10` with only six body bytes.
const SHORT_CONTENT_LENGTH: &[u8] = b"\
    HTTP/1.1 200 OK\r\n\
    Content-Length: 10\r\n\
    \r\n\
    123456";

/// A chunk declaring ten bytes that carries six, then nothing.
const SHORT_CHUNK: &[u8] = b"\
    HTTP/1.1 200 OK\r\n\
    Transfer-Encoding: chunked\r\n\
    \r\n\
    a\r\n\
    123456";

const SHORT_GZIP_HEAD: &[u8] = b"\
    HTTP/1.1 200 OK\r\n\
    Content-Encoding: gzip\r\n\
    Content-Length: 30\r\n\
    \r\n";

/// A canned response. The `Short*` fixtures are written byte for byte and
/// break their framing on purpose; the rest are produced by the body
/// writers and are well formed unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    ShortContentLength,
    ShortChunk,
    /// `content-length: 30` followed by the 25 bytes of [`GZIP_HELLO`].
    ShortGzip,
    Hello,
    Chunked,
    Gzip,
    UntilClose,
    /// One chunk, then an invalid chunk-size line.
    AbortedChunk,
}

impl Fixture {
    pub const ALL: [Fixture; 8] = [
        Fixture::ShortContentLength,
        Fixture::ShortChunk,
        Fixture::ShortGzip,
        Fixture::Hello,
        Fixture::Chunked,
        Fixture::Gzip,
        Fixture::UntilClose,
        Fixture::AbortedChunk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ShortContentLength => "short-content-length",
            Self::ShortChunk => "short-chunk",
            Self::ShortGzip => "short-gzip",
            Self::Hello => "hello",
            Self::Chunked => "chunked",
            Self::Gzip => "gzip",
            Self::UntilClose => "until-close",
            Self::AbortedChunk => "aborted-chunk",
        }
    }

    /// Write the whole response to `io` and flush it. Closing the
    /// connection is left to the caller.
    pub async fn write_to<W: AsyncWriteExt + Unpin>(&self, io: W) -> HarnessResult<()> {
        let writer = ResponseWriter::new(io);
        let mut io = match self {
            Self::ShortContentLength => writer.send_raw(SHORT_CONTENT_LENGTH).await?,
            Self::ShortChunk => writer.send_raw(SHORT_CHUNK).await?,
            Self::ShortGzip => {
                let mut raw = SHORT_GZIP_HEAD.to_vec();
                raw.extend_from_slice(GZIP_HELLO);
                writer.send_raw(&raw).await?
            }
            Self::Hello => {
                let res = ResponseBuilder::new(0).build();
                let mut body = writer.send_as_content_length(&res, 5).await?;
                body.write(b"hello").await?;
                body.finish().await?
            }
            Self::Chunked => {
                let res = ResponseBuilder::new(0).build();
                let mut body = writer.send_as_chunked(&res).await?;
                body.write(b"abc").await?;
                body.write(b"de").await?;
                body.finish().await?
            }
            Self::Gzip => {
                let res = ResponseBuilder::new(1)
                    .with_header("content-encoding", b"gzip")
                    .build();
                let mut body = writer
                    .send_as_content_length(&res, GZIP_HELLO.len() as u64)
                    .await?;
                body.write(GZIP_HELLO).await?;
                body.finish().await?
            }
            Self::UntilClose => {
                let res = ResponseBuilder::new(0).build();
                let mut body = writer.send_until_close(&res).await?;
                body.write(b"hello").await?;
                body.finish().await?
            }
            Self::AbortedChunk => {
                let res = ResponseBuilder::new(0).build();
                let mut body = writer.send_as_chunked(&res).await?;
                body.write(b"hello").await?;
                body.abort().await?
            }
        };
        io.flush().await.map_err(HarnessError::WriteError)
    }
}

impl std::fmt::Display for Fixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Fixture {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| HarnessError::UnknownFixture(s.to_string()))
    }
}
