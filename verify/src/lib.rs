//! Turns the outcome of reading a body into a [`Verdict`].
//!
//! The verdict is computed from raw wire bytes only. A [`VerifiedBody`] is
//! handed out for [`Verdict::Complete`] and nothing else, so content can only
//! be decoded from a body whose framing obligations were met.

mod decode;

pub use decode::{Content, DecodeError};

use bodycheck_body::{BodyError, BodyResult, ChunkFault};
use bytes::Bytes;
use tracing::warn;

/// Whether a response body arrived in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every declared length was met exactly by raw bytes.
    Complete,
    /// The stream ended before the declared length. `expected` is `None` when
    /// the body had no declared length and the read timed out.
    Incomplete { expected: Option<u64>, actual: u64 },
    /// A chunk was cut short or malformed.
    ChunkFramingError {
        declared: u64,
        available: u64,
        fault: ChunkFault,
    },
    /// The response head could not be parsed, so no body was read.
    HeaderParseError { reason: String },
}

impl Verdict {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => f.write_str("complete"),
            Self::Incomplete {
                expected: Some(expected),
                actual,
            } => write!(f, "incomplete: expected {expected} bytes, got {actual}"),
            Self::Incomplete {
                expected: None,
                actual,
            } => write!(f, "incomplete: timed out after {actual} bytes"),
            Self::ChunkFramingError {
                declared,
                available,
                fault,
            } => write!(
                f,
                "chunk framing error ({fault}): chunk declared {declared} bytes, {available} available"
            ),
            Self::HeaderParseError { reason } => write!(f, "header parse error: {reason}"),
        }
    }
}

/// Raw body bytes that passed verification.
#[derive(Debug, Clone)]
pub struct VerifiedBody(Bytes);

impl VerifiedBody {
    /// The body exactly as it was framed on the wire.
    pub fn raw(&self) -> &Bytes {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Verification {
    verdict: Verdict,
    raw_len: u64,
    body: Option<VerifiedBody>,
}

impl Verification {
    /// A response whose head never parsed.
    pub fn header_parse_error(reason: impl std::fmt::Display) -> Self {
        Self {
            verdict: Verdict::HeaderParseError {
                reason: reason.to_string(),
            },
            raw_len: 0,
            body: None,
        }
    }

    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Raw body bytes that arrived, whether or not the body was complete.
    /// For a chunked body this counts chunk payload only.
    pub fn raw_len(&self) -> u64 {
        self.raw_len
    }

    /// Present only when the verdict is [`Verdict::Complete`].
    pub fn body(&self) -> Option<&VerifiedBody> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<VerifiedBody> {
        self.body
    }
}

/// Map the terminal state of a body read to its verdict. Failures that say
/// nothing about completeness, such as I/O errors or an overflowing body,
/// are handed back unchanged.
pub fn verify(result: BodyResult<Bytes>) -> Result<Verification, BodyError> {
    let (verdict, raw_len, body) = match result {
        Ok(raw) => (Verdict::Complete, raw.len() as u64, Some(VerifiedBody(raw))),
        Err(BodyError::IncompleteBody { expected, actual }) => (
            Verdict::Incomplete {
                expected: Some(expected),
                actual,
            },
            actual,
            None,
        ),
        Err(BodyError::Interrupted { actual }) => (
            Verdict::Incomplete {
                expected: None,
                actual,
            },
            actual,
            None,
        ),
        Err(BodyError::ChunkFraming {
            declared,
            available,
            received,
            fault,
        }) => (
            Verdict::ChunkFramingError {
                declared,
                available,
                fault,
            },
            received,
            None,
        ),
        Err(e) => return Err(e),
    };

    if !verdict.is_complete() {
        warn!(%verdict, "response body failed verification");
    }

    Ok(Verification {
        verdict,
        raw_len,
        body,
    })
}

#[cfg(test)]
mod test {
    use bodycheck_body::{BodyError, ChunkFault};
    use bytes::Bytes;
    use proptest::prelude::*;

    use crate::{Verdict, Verification, verify};

    #[test]
    fn complete_carries_body() {
        let v = verify(Ok(Bytes::from_static(b"hello"))).unwrap();
        assert_eq!(&Verdict::Complete, v.verdict());
        assert_eq!(5, v.raw_len());
        assert_eq!(&b"hello"[..], v.body().unwrap().raw());
    }

    #[test]
    fn short_fixed_length() {
        let v = verify(Err(BodyError::IncompleteBody {
            expected: 10,
            actual: 6,
        }))
        .unwrap();
        assert_eq!(
            &Verdict::Incomplete {
                expected: Some(10),
                actual: 6
            },
            v.verdict()
        );
        assert_eq!(6, v.raw_len());
        assert!(v.body().is_none());
    }

    #[test]
    fn until_close_timeout() {
        let v = verify(Err(BodyError::Interrupted { actual: 3 })).unwrap();
        assert_eq!(
            &Verdict::Incomplete {
                expected: None,
                actual: 3
            },
            v.verdict()
        );
        assert!(v.into_body().is_none());
    }

    #[test]
    fn short_chunk() {
        let v = verify(Err(BodyError::ChunkFraming {
            declared: 10,
            available: 6,
            received: 6,
            fault: ChunkFault::Truncated,
        }))
        .unwrap();
        assert_eq!(
            &Verdict::ChunkFramingError {
                declared: 10,
                available: 6,
                fault: ChunkFault::Truncated
            },
            v.verdict()
        );
        assert!(v.body().is_none());
    }

    #[test]
    fn short_chunk_after_complete_chunk() {
        // a 3 byte chunk arrived in full, then 2 of 10
        let v = verify(Err(BodyError::ChunkFraming {
            declared: 10,
            available: 2,
            received: 5,
            fault: ChunkFault::Truncated,
        }))
        .unwrap();
        assert_eq!(
            &Verdict::ChunkFramingError {
                declared: 10,
                available: 2,
                fault: ChunkFault::Truncated
            },
            v.verdict()
        );
        assert_eq!(5, v.raw_len());
    }

    #[test]
    fn io_errors_are_not_verdicts() {
        let err = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert!(matches!(
            verify(Err(BodyError::BodyReadError(err))).unwrap_err(),
            BodyError::BodyReadError(_)
        ));
        assert!(matches!(
            verify(Err(BodyError::BodyOverflow(4))).unwrap_err(),
            BodyError::BodyOverflow(4)
        ));
    }

    #[test]
    fn header_parse_error_has_no_body() {
        let v = Verification::header_parse_error("unexpected eof");
        assert_eq!(
            &Verdict::HeaderParseError {
                reason: "unexpected eof".to_string()
            },
            v.verdict()
        );
        assert_eq!(0, v.raw_len());
        assert!(v.body().is_none());
    }

    #[test]
    fn verdict_display() {
        let v = Verdict::Incomplete {
            expected: Some(30),
            actual: 25,
        };
        assert_eq!("incomplete: expected 30 bytes, got 25", v.to_string());
    }

    proptest! {
        #[test]
        fn only_complete_yields_a_body(
            declared in any::<u64>(),
            actual in any::<u64>(),
            kind in 0u8..3,
        ) {
            let err = match kind {
                0 => BodyError::IncompleteBody { expected: declared, actual },
                1 => BodyError::Interrupted { actual },
                _ => BodyError::ChunkFraming {
                    declared,
                    available: actual,
                    received: actual,
                    fault: ChunkFault::Truncated,
                },
            };
            let v = verify(Err(err)).unwrap();
            prop_assert!(!v.verdict().is_complete());
            prop_assert!(v.body().is_none());
        }
    }
}
