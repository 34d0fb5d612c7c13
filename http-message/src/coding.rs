use bytes::Bytes;

/// A response's `content-encoding`, reduced to what bodycheck can reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentCoding {
    /// No `content-encoding` header, or `identity`.
    Identity,
    /// `gzip` or its legacy alias `x-gzip`.
    Gzip,
    /// Anything else, including stacked codings like `gzip, br`. The raw
    /// header value is kept so it can be reported to the caller.
    Unsupported(Bytes),
}

impl ContentCoding {
    pub fn from_header(value: Option<&Bytes>) -> Self {
        let Some(value) = value else {
            return Self::Identity;
        };
        let token = value.trim_ascii();
        if token.is_empty() || token.eq_ignore_ascii_case(b"identity") {
            Self::Identity
        } else if token.eq_ignore_ascii_case(b"gzip") || token.eq_ignore_ascii_case(b"x-gzip") {
            Self::Gzip
        } else {
            Self::Unsupported(value.clone())
        }
    }
}

impl std::fmt::Display for ContentCoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => f.write_str("identity"),
            Self::Gzip => f.write_str("gzip"),
            Self::Unsupported(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}
