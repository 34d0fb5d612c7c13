use bodycheck_util::{
    debug::AsciiDebug,
    parse::{last_list_element, parse_content_length},
};
use bytes::Bytes;

use crate::{coding::ContentCoding, framing::FramingMode};

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("Invalid content length: {0}")]
    InvalidContentLength(String),
}

/// The header fields of one message, in the order they were received.
///
/// Lookups are case-insensitive. When a field is repeated, the last
/// occurrence wins.
#[derive(Default, Clone)]
pub struct HeaderSet {
    headers: Vec<(Bytes, Bytes)>,
}

impl HeaderSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            headers: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Bytes, Bytes)> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn get(&self, needle: &str) -> Option<&Bytes> {
        let needle = needle.as_bytes();
        self.headers
            .iter()
            .rev()
            .find(|(name, _)| needle.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn content_length(&self) -> Result<Option<u64>, HeaderError> {
        let Some(value) = self.get("content-length") else {
            return Ok(None);
        };
        parse_content_length(value).map(Some).ok_or_else(|| {
            HeaderError::InvalidContentLength(String::from_utf8_lossy(value).into_owned())
        })
    }

    /// True when `transfer-encoding` names `chunked` as its final coding.
    /// Other transfer codings are not recognized and are treated as if the
    /// header were absent.
    pub fn is_chunked(&self) -> bool {
        self.get("transfer-encoding")
            .is_some_and(|te| last_list_element(te).eq_ignore_ascii_case(b"chunked"))
    }

    /// Decide how the body is framed. `transfer-encoding: chunked` takes
    /// precedence over `content-length`, which is then not even validated.
    pub fn framing(&self) -> Result<FramingMode, HeaderError> {
        if self.is_chunked() {
            return Ok(FramingMode::Chunked);
        }
        Ok(match self.content_length()? {
            Some(len) => FramingMode::FixedLength(len),
            None => FramingMode::UntilClose,
        })
    }

    pub fn content_coding(&self) -> ContentCoding {
        ContentCoding::from_header(self.get("content-encoding"))
    }
}

impl std::fmt::Debug for HeaderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.headers
                    .iter()
                    .map(|(n, v)| (AsciiDebug::new(n), AsciiDebug::new(v))),
            )
            .finish()
    }
}
