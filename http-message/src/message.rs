use bodycheck_util::buffer::Buffer;
use bytes::{Bytes, BytesMut};

pub use httparse::Error as HttpParseError;

use crate::{
    coding::ContentCoding,
    framing::FramingMode,
    header::{HeaderError, HeaderSet},
    span::Span,
    version::HttpVersion,
};

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Malformed message head: {0}")]
    Parse(#[from] HttpParseError),
    #[error("Unsupported HTTP version: HTTP/1.{0}")]
    UnsupportedVersion(u8),
}

/// Cut the parsed header fields out of the frozen head buffer.
fn collect_headers(
    parse_buf: &[u8],
    parsed: &[httparse::Header<'_>],
) -> Vec<(Span, Span)> {
    parsed
        .iter()
        .map(|h| {
            (
                Span::new_or_empty(parse_buf, h.name.as_bytes()),
                Span::new_or_empty(parse_buf, h.value),
            )
        })
        .collect()
}

fn populate_headers(spans: &[(Span, Span)], head_buf: &Bytes) -> HeaderSet {
    let mut headers = HeaderSet::with_capacity(spans.len());
    for (name, value) in spans {
        headers.push(name.slice_from(head_buf), value.slice_from(head_buf));
    }
    headers
}

fn version(minor: Option<u8>) -> Result<HttpVersion, MessageError> {
    HttpVersion::try_from(minor.unwrap_or_default()).map_err(MessageError::UnsupportedVersion)
}

pub struct Request {
    method: Bytes,
    path: Bytes,
    version: HttpVersion,
    headers: HeaderSet,
}

impl Request {
    /// Parse a request head from the front of `buf`. On success the head is
    /// removed from `buf`; `Ok(None)` means more bytes are needed.
    pub fn parse(buf: &mut Buffer, max_headers: usize) -> Result<Option<Self>, MessageError> {
        let mut parse_headers = vec![httparse::EMPTY_HEADER; max_headers];
        let mut req = httparse::Request::new(&mut parse_headers);
        let head_len = match req.parse(buf)? {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(head_len) => head_len,
        };

        let version = version(req.version)?;
        let method = Span::new_or_empty(buf, req.method.unwrap_or_default().as_bytes());
        let path = Span::new_or_empty(buf, req.path.unwrap_or_default().as_bytes());
        let spans = collect_headers(buf, req.headers);

        let head_buf = buf.split_to(head_len).freeze();
        Ok(Some(Self {
            method: method.slice_from(&head_buf),
            path: path.slice_from(&head_buf),
            version,
            headers: populate_headers(&spans, &head_buf),
        }))
    }

    pub fn method(&self) -> &Bytes {
        &self.method
    }

    pub fn path(&self) -> &Bytes {
        &self.path
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn get_header(&self, needle: &str) -> Option<&Bytes> {
        self.headers.get(needle)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &String::from_utf8_lossy(&self.method))
            .field("path", &String::from_utf8_lossy(&self.path))
            .field("version", &self.version)
            .field("headers", &self.headers)
            .finish()
    }
}

pub struct Response {
    version: HttpVersion,
    code: u16,
    reason: Bytes,
    headers: HeaderSet,
}

impl Response {
    /// Parse a response head from the front of `buf`. On success the head,
    /// including the blank line that ends it, is removed from `buf` so that
    /// `buf` starts at the first body byte. `Ok(None)` means more bytes are
    /// needed.
    pub fn parse(buf: &mut Buffer, max_headers: usize) -> Result<Option<Self>, MessageError> {
        let mut parse_headers = vec![httparse::EMPTY_HEADER; max_headers];
        let mut res = httparse::Response::new(&mut parse_headers);
        let head_len = match res.parse(buf)? {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(head_len) => head_len,
        };

        let version = version(res.version)?;
        let code = res.code.unwrap_or_default();
        let reason = Span::new_or_empty(buf, res.reason.unwrap_or_default().as_bytes());
        let spans = collect_headers(buf, res.headers);

        let head_buf = buf.split_to(head_len).freeze();
        Ok(Some(Self {
            version,
            code,
            reason: reason.slice_from(&head_buf),
            headers: populate_headers(&spans, &head_buf),
        }))
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &Bytes {
        &self.reason
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn get_header(&self, needle: &str) -> Option<&Bytes> {
        self.headers.get(needle)
    }

    pub fn framing(&self) -> Result<FramingMode, HeaderError> {
        self.headers.framing()
    }

    pub fn content_coding(&self) -> ContentCoding {
        self.headers.content_coding()
    }

    pub fn is_informational(&self) -> Option<u16> {
        let c = self.code();
        (100..200).contains(&c).then_some(c)
    }

    /// 2xx, the same test `reqwest` applies for `is_success`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("version", &self.version)
            .field("code", &self.code)
            .field("reason", &String::from_utf8_lossy(&self.reason))
            .field("headers", &self.headers)
            .finish()
    }
}

fn build_headers(fields: &[(&str, &[u8])], buf: &mut BytesMut) -> HeaderSet {
    let mut headers = HeaderSet::with_capacity(fields.len());
    for (name, value) in fields {
        buf.extend_from_slice(name.as_bytes());
        let name = buf.split().freeze();
        buf.extend_from_slice(value);
        let value = buf.split().freeze();
        headers.push(name, value);
    }
    headers
}

#[derive(Debug, Default)]
pub struct RequestBuilder<'s> {
    method: Option<&'s str>,
    path: Option<&'s str>,
    headers: Vec<(&'s str, &'s [u8])>,
}

impl<'s> RequestBuilder<'s> {
    pub fn new(initial_header_count: usize) -> Self {
        Self {
            method: None,
            path: None,
            headers: Vec::with_capacity(initial_header_count),
        }
    }

    pub fn with_method(&mut self, method: &'s str) -> &mut Self {
        self.method = Some(method);
        self
    }

    pub fn with_path(&mut self, path: &'s str) -> &mut Self {
        self.path = Some(path);
        self
    }

    pub fn with_header(&mut self, name: &'s str, value: &'s [u8]) -> &mut Self {
        self.headers.push((name, value));
        self
    }

    /// Requests are always built as HTTP/1.1; method and path default to
    /// `GET /`.
    pub fn build(&self) -> Request {
        let mut buf = BytesMut::with_capacity(128);

        buf.extend_from_slice(self.method.unwrap_or("GET").as_bytes());
        let method = buf.split().freeze();
        buf.extend_from_slice(self.path.unwrap_or("/").as_bytes());
        let path = buf.split().freeze();

        Request {
            method,
            path,
            version: HttpVersion::Http11,
            headers: build_headers(&self.headers, &mut buf),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResponseBuilder<'s> {
    code: Option<u16>,
    reason: Option<&'s str>,
    headers: Vec<(&'s str, &'s [u8])>,
}

impl<'s> ResponseBuilder<'s> {
    pub fn new(initial_header_capacity: usize) -> Self {
        Self {
            code: None,
            reason: None,
            headers: Vec::with_capacity(initial_header_capacity),
        }
    }

    pub fn with_code(&mut self, code: u16) -> &mut Self {
        self.code = Some(code);
        self
    }

    pub fn with_reason(&mut self, reason: &'s str) -> &mut Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_header(&mut self, name: &'s str, value: &'s [u8]) -> &mut Self {
        self.headers.push((name, value));
        self
    }

    /// Responses are always built as HTTP/1.1; the status defaults to
    /// `200 OK`.
    pub fn build(&self) -> Response {
        let mut buf = BytesMut::with_capacity(128);

        buf.extend_from_slice(self.reason.unwrap_or("OK").as_bytes());
        let reason = buf.split().freeze();

        Response {
            version: HttpVersion::Http11,
            code: self.code.unwrap_or(200),
            reason,
            headers: build_headers(&self.headers, &mut buf),
        }
    }
}
