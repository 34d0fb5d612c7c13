/// The three ways the end of a response body can be found on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// The body is exactly this many raw bytes, from `content-length: <len>`.
    FixedLength(u64),
    /// The body is a sequence of length-prefixed chunks ending with an empty
    /// chunk, from `transfer-encoding: chunked`.
    Chunked,
    /// Neither framing header is present. The body ends when the connection
    /// closes.
    UntilClose,
}

impl FramingMode {
    /// The raw body length the sender committed to up front, if any.
    pub fn declared_length(&self) -> Option<u64> {
        match self {
            Self::FixedLength(len) => Some(*len),
            Self::Chunked | Self::UntilClose => None,
        }
    }

    pub fn is_until_close(&self) -> bool {
        matches!(self, Self::UntilClose)
    }
}

impl std::fmt::Display for FramingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedLength(len) => write!(f, "content-length {len}"),
            Self::Chunked => f.write_str("chunked"),
            Self::UntilClose => f.write_str("until-close"),
        }
    }
}
