//! Reads one HTTP/1.1 response and decides whether its body arrived in full.
//!
//! [`check_response`] runs the whole pipeline over any stream positioned at
//! the start of a response: head, framing, verification, and, for complete
//! bodies only, content decoding. [`fetch`] connects and sends a `GET`
//! first.

pub mod error;
pub mod reader;
pub mod writer;

use std::time::Duration;

use bodycheck_http_message::message::{Request, RequestBuilder, Response};
use bodycheck_verify::{Content, DecodeError, Verdict, Verification, verify};
use tokio::{io::AsyncReadExt, net::TcpStream};
use tracing::{debug, warn};

pub use crate::error::{ClientError, ClientResult, HeadError};
use crate::{reader::ResponseReader, writer::RequestWriter};

const USER_AGENT: &str = concat!("bodycheck/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Largest response head, in bytes.
    pub max_head_length: usize,
    pub max_headers: usize,
    /// Largest raw body, in bytes.
    pub max_body_length: u64,
    /// Largest decoded body, in bytes.
    pub max_decoded_length: u64,
    /// How long a single read may wait for bytes. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            max_head_length: 8192,
            max_headers: 256,
            max_body_length: 64 * 1024 * 1024,
            max_decoded_length: 64 * 1024 * 1024,
            read_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl CheckConfig {
    pub fn with_max_head_length(mut self, max_head_length: usize) -> Self {
        self.max_head_length = max_head_length;
        self
    }

    pub fn with_max_headers(mut self, max_headers: usize) -> Self {
        self.max_headers = max_headers;
        self
    }

    pub fn with_max_body_length(mut self, max_body_length: u64) -> Self {
        self.max_body_length = max_body_length;
        self
    }

    pub fn with_max_decoded_length(mut self, max_decoded_length: u64) -> Self {
        self.max_decoded_length = max_decoded_length;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Everything learned about one response.
#[derive(Debug)]
pub struct CheckedResponse {
    head: Option<Response>,
    verification: Verification,
    content: Option<Content>,
    decode_error: Option<DecodeError>,
}

impl CheckedResponse {
    /// The status line and headers. Absent when the head did not parse.
    pub fn head(&self) -> Option<&Response> {
        self.head.as_ref()
    }

    pub fn verdict(&self) -> &Verdict {
        self.verification.verdict()
    }

    /// Raw body bytes that arrived, before any content-coding is reversed.
    pub fn raw_len(&self) -> u64 {
        self.verification.raw_len()
    }

    /// Decoded content. Present only when the verdict is
    /// [`Verdict::Complete`] and decoding succeeded.
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Set when the body was complete but its content-coding could not be
    /// reversed.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        self.decode_error.as_ref()
    }

    pub fn into_decode_error(self) -> Option<DecodeError> {
        self.decode_error
    }

    /// Complete and, if encoded, decoded.
    pub fn is_ok(&self) -> bool {
        self.verdict().is_complete() && self.decode_error.is_none()
    }
}

/// Check a response to a `GET` (or any request whose response may carry a
/// body) read from `io`.
pub async fn check_response<I: AsyncReadExt + Unpin>(
    io: I,
    config: &CheckConfig,
) -> ClientResult<CheckedResponse> {
    check(io, config, true).await
}

/// Check a response to a `HEAD` request. The body is taken to be empty
/// whatever the framing headers say.
pub async fn check_head_response<I: AsyncReadExt + Unpin>(
    io: I,
    config: &CheckConfig,
) -> ClientResult<CheckedResponse> {
    check(io, config, false).await
}

async fn check<I: AsyncReadExt + Unpin>(
    io: I,
    config: &CheckConfig,
    allow_body: bool,
) -> ClientResult<CheckedResponse> {
    let response = match ResponseReader::new(io, config).read(allow_body).await {
        Ok(response) => response,
        Err(ClientError::Head(e)) => {
            warn!(error = %e, "could not read response head");
            return Ok(CheckedResponse {
                head: None,
                verification: Verification::header_parse_error(e),
                content: None,
                decode_error: None,
            });
        }
        Err(e) => return Err(e),
    };

    let (res, body) = response.into_parts();
    let raw = body
        .collect(config.max_body_length)
        .await
        .map(|collected| collected.raw);
    let verification = verify(raw).map_err(ClientError::BodyReadError)?;

    let (content, decode_error) = match verification.body() {
        Some(body) => match body.decode(&res.content_coding(), config.max_decoded_length) {
            Ok(content) => (Some(content), None),
            Err(e) => (None, Some(e)),
        },
        None => (None, None),
    };
    debug!(verdict = %verification.verdict(), raw_len = verification.raw_len(), "response checked");

    Ok(CheckedResponse {
        head: Some(res),
        verification,
        content,
        decode_error,
    })
}

/// Build the `GET` request [`fetch`] sends.
pub fn get_request(authority: &str, path: &str) -> Request {
    RequestBuilder::new(4)
        .with_method("GET")
        .with_path(path)
        .with_header("host", authority.as_bytes())
        .with_header("user-agent", USER_AGENT.as_bytes())
        .with_header("accept-encoding", b"gzip")
        .with_header("connection", b"close")
        .build()
}

/// Connect to `authority` (`host:port`), send `GET path`, and check the
/// response.
pub async fn fetch(
    authority: &str,
    path: &str,
    config: &CheckConfig,
) -> ClientResult<CheckedResponse> {
    let stream = TcpStream::connect(authority)
        .await
        .map_err(ClientError::ConnectError)?;
    let (read, write) = stream.into_split();

    let mut writer = RequestWriter::new(write);
    writer.send(&get_request(authority, path)).await?;
    let _write = writer.shutdown().await?;
    debug!(authority, path, "request sent");

    check_response(read, config).await
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use bodycheck_body::ChunkFault;
    use bodycheck_harness::{FaultServer, Fixture};
    use bodycheck_verify::{Content, DecodeError, Verdict};
    use bytes::Bytes;
    use flate2::{Compression, write::GzEncoder};
    use proptest::prelude::*;

    use crate::{CheckConfig, CheckedResponse, check_head_response, check_response, fetch};

    async fn fetch_fixture(fixture: Fixture) -> CheckedResponse {
        let server = FaultServer::bind("127.0.0.1:0", fixture).await.unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let serve = tokio::spawn(async move { server.serve_one().await });

        let checked = fetch(&addr, "/", &CheckConfig::default()).await.unwrap();
        serve.await.unwrap().unwrap();
        checked
    }

    #[tokio::test]
    async fn short_content_length() {
        let checked = fetch_fixture(Fixture::ShortContentLength).await;
        assert_eq!(
            &Verdict::Incomplete {
                expected: Some(10),
                actual: 6
            },
            checked.verdict()
        );
        assert_eq!(6, checked.raw_len());
        assert!(checked.content().is_none());
        assert!(!checked.is_ok());
    }

    #[tokio::test]
    async fn short_chunk() {
        let checked = fetch_fixture(Fixture::ShortChunk).await;
        assert_eq!(
            &Verdict::ChunkFramingError {
                declared: 10,
                available: 6,
                fault: ChunkFault::Truncated
            },
            checked.verdict()
        );
        assert!(checked.content().is_none());
    }

    #[tokio::test]
    async fn short_gzip() {
        let checked = fetch_fixture(Fixture::ShortGzip).await;
        assert_eq!(
            &Verdict::Incomplete {
                expected: Some(30),
                actual: 25
            },
            checked.verdict()
        );
        // the 25 bytes that did arrive are a valid gzip stream on their own,
        // but they are never decoded
        assert!(checked.content().is_none());
        assert!(checked.decode_error().is_none());
    }

    #[tokio::test]
    async fn hello() {
        let checked = fetch_fixture(Fixture::Hello).await;
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert_eq!(
            Some(&Content::Identity(Bytes::from_static(b"hello"))),
            checked.content()
        );
        assert_eq!(200, checked.head().unwrap().code());
        assert!(checked.is_ok());
    }

    #[tokio::test]
    async fn chunked() {
        let checked = fetch_fixture(Fixture::Chunked).await;
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert_eq!(5, checked.raw_len());
        assert_eq!(&b"abcde"[..], checked.content().unwrap().bytes());
    }

    #[tokio::test]
    async fn gzip() {
        let checked = fetch_fixture(Fixture::Gzip).await;
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert_eq!(25, checked.raw_len());
        assert_eq!(
            Some(&Content::Decoded(Bytes::from_static(b"hello"))),
            checked.content()
        );
    }

    #[tokio::test]
    async fn until_close() {
        let checked = fetch_fixture(Fixture::UntilClose).await;
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert_eq!(&b"hello"[..], checked.content().unwrap().bytes());
    }

    #[tokio::test]
    async fn aborted_chunk() {
        let checked = fetch_fixture(Fixture::AbortedChunk).await;
        assert!(matches!(
            checked.verdict(),
            Verdict::ChunkFramingError {
                fault: ChunkFault::InvalidSize,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn header_parse_error_verdict() {
        let input = b"HTTP/1.1 200 OK\r\ncontent-length: ten\r\n\r\nhello";
        let checked = check_response(&input[..], &CheckConfig::default())
            .await
            .unwrap();
        assert!(matches!(
            checked.verdict(),
            Verdict::HeaderParseError { .. }
        ));
        assert!(checked.head().is_none());
        assert!(checked.content().is_none());
    }

    #[tokio::test]
    async fn head_request_ignores_content_length() {
        let input = b"HTTP/1.1 200 OK\r\ncontent-length: 10\r\n\r\n";
        let checked = check_head_response(&input[..], &CheckConfig::default())
            .await
            .unwrap();
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert_eq!(0, checked.raw_len());
    }

    #[tokio::test]
    async fn corrupt_gzip_is_a_decode_error() {
        let input = b"\
            HTTP/1.1 200 OK\r\n\
            content-encoding: gzip\r\n\
            content-length: 5\r\n\
            \r\n\
            hello";
        let checked = check_response(&input[..], &CheckConfig::default())
            .await
            .unwrap();
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert!(checked.content().is_none());
        assert!(matches!(
            checked.decode_error(),
            Some(DecodeError::Corrupt { .. })
        ));
        assert!(!checked.is_ok());
    }

    #[tokio::test]
    async fn decoded_length_is_not_checked_against_content_length() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&[b'a'; 1000]).unwrap();
        let gz = enc.finish().unwrap();

        let mut input = format!(
            "HTTP/1.1 200 OK\r\ncontent-encoding: gzip\r\ncontent-length: {}\r\n\r\n",
            gz.len()
        )
        .into_bytes();
        input.extend_from_slice(&gz);

        let checked = check_response(&input[..], &CheckConfig::default())
            .await
            .unwrap();
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert_eq!(gz.len() as u64, checked.raw_len());
        assert_eq!(1000, checked.content().unwrap().bytes().len());
    }

    #[tokio::test]
    async fn body_overflow_is_an_error() {
        let input = b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\nhello";
        let config = CheckConfig::default().with_max_body_length(4);
        assert!(check_response(&input[..], &config).await.is_err());
    }

    #[tokio::test]
    async fn huge_declared_length_is_incomplete() {
        let input = b"HTTP/1.1 200 OK\r\ncontent-length: 100000000\r\n\r\n123456";
        let checked = check_response(&input[..], &CheckConfig::default())
            .await
            .unwrap();
        assert_eq!(
            &Verdict::Incomplete {
                expected: Some(100_000_000),
                actual: 6
            },
            checked.verdict()
        );
        assert_eq!(6, checked.raw_len());
    }

    #[tokio::test]
    async fn chunked_raw_len_counts_every_chunk() {
        let input = b"\
            HTTP/1.1 200 OK\r\n\
            transfer-encoding: chunked\r\n\
            \r\n\
            3\r\nabc\r\n\
            a\r\n12";
        let checked = check_response(&input[..], &CheckConfig::default())
            .await
            .unwrap();
        assert_eq!(
            &Verdict::ChunkFramingError {
                declared: 10,
                available: 2,
                fault: ChunkFault::Truncated
            },
            checked.verdict()
        );
        assert_eq!(5, checked.raw_len());
    }

    #[tokio::test]
    async fn chunked_trailer_with_trailing_whitespace() {
        let input = b"\
            HTTP/1.1 200 OK\r\n\
            transfer-encoding: chunked\r\n\
            \r\n\
            5\r\nhello\r\n\
            0\r\n\
            x-sum: abc \r\n\
            \r\n";
        let checked = check_response(&input[..], &CheckConfig::default())
            .await
            .unwrap();
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert_eq!(5, checked.raw_len());
    }

    #[tokio::test]
    async fn decoded_overflow_is_a_decode_error() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&[0u8; 4096]).unwrap();
        let gz = enc.finish().unwrap();

        let mut input = format!(
            "HTTP/1.1 200 OK\r\ncontent-encoding: gzip\r\ncontent-length: {}\r\n\r\n",
            gz.len()
        )
        .into_bytes();
        input.extend_from_slice(&gz);

        let config = CheckConfig::default().with_max_decoded_length(1024);
        let checked = check_response(&input[..], &config).await.unwrap();
        assert_eq!(&Verdict::Complete, checked.verdict());
        assert!(matches!(
            checked.decode_error(),
            Some(DecodeError::TooLarge { limit: 1024 })
        ));
    }

    proptest! {
        #[test]
        fn content_length_verdict(declared in 0u64..64, delivered in 0u64..128) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let mut input = format!("HTTP/1.1 200 OK\r\ncontent-length: {declared}\r\n\r\n").into_bytes();
            input.extend(std::iter::repeat_n(b'x', delivered as usize));

            let checked = rt
                .block_on(check_response(&input[..], &CheckConfig::default()))
                .unwrap();
            if delivered >= declared {
                prop_assert_eq!(&Verdict::Complete, checked.verdict());
                prop_assert_eq!(declared, checked.raw_len());
                prop_assert!(checked.content().is_some());
            } else {
                prop_assert_eq!(
                    &Verdict::Incomplete { expected: Some(declared), actual: delivered },
                    checked.verdict()
                );
                prop_assert!(checked.content().is_none());
            }
        }
    }
}
