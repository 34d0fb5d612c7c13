//! Validation of the trailer section that follows the terminal chunk.

use bodycheck_util::parse::{is_field_vchar, is_ows, is_tchar};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrailerError {
    #[error("Invalid trailer field name")]
    InvalidFieldName,
    #[error("Invalid trailer field value")]
    InvalidFieldValue,
    #[error("Invalid trailer section terminator")]
    InvalidTerminator,
}

/// Incremental parser for `*( field-line CRLF ) CRLF`. State survives between
/// calls to [`TrailerParser::feed`], so each byte is looked at once.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) enum TrailerParser {
    #[default]
    LineStart,
    InName,
    BeforeValue,
    InValue,
    NeedLineLF,
    NeedFinalLF,
}

impl TrailerParser {
    /// Feed one byte. Returns true once the final CRLF has been consumed.
    fn give(&mut self, b: u8) -> Result<bool, TrailerError> {
        *self = match self {
            Self::LineStart if b == b'\r' => Self::NeedFinalLF,
            Self::LineStart if is_tchar(b) => Self::InName,
            Self::LineStart => return Err(TrailerError::InvalidFieldName),
            Self::InName if b == b':' => Self::BeforeValue,
            Self::InName if is_tchar(b) => Self::InName,
            Self::InName => return Err(TrailerError::InvalidFieldName),
            // an empty value is allowed
            Self::BeforeValue if b == b'\r' => Self::NeedLineLF,
            Self::BeforeValue if is_ows(b) => Self::BeforeValue,
            Self::BeforeValue if is_field_vchar(b) => Self::InValue,
            Self::BeforeValue => return Err(TrailerError::InvalidFieldValue),
            // trailing OWS belongs to the field line, not the value
            Self::InValue if b == b'\r' => Self::NeedLineLF,
            Self::InValue if is_ows(b) || is_field_vchar(b) => Self::InValue,
            Self::InValue => return Err(TrailerError::InvalidFieldValue),
            Self::NeedLineLF if b == b'\n' => Self::LineStart,
            Self::NeedLineLF => return Err(TrailerError::InvalidFieldValue),
            Self::NeedFinalLF if b == b'\n' => return Ok(true),
            Self::NeedFinalLF => return Err(TrailerError::InvalidTerminator),
        };
        Ok(false)
    }

    /// Continue parsing with the next bytes of the trailer section. On
    /// [`httparse::Status::Complete`], the value is how many bytes of `buf`
    /// finished the section. On [`httparse::Status::Partial`], all of `buf`
    /// was consumed.
    pub(crate) fn feed(&mut self, buf: &[u8]) -> Result<httparse::Status<usize>, TrailerError> {
        for (ix, &b) in buf.iter().enumerate() {
            if self.give(b)? {
                return Ok(httparse::Status::Complete(ix + 1));
            }
        }
        Ok(httparse::Status::Partial)
    }
}

#[cfg(test)]
mod test {
    use super::{TrailerError, TrailerParser};

    fn parse_trailers(buf: &[u8]) -> Result<httparse::Status<usize>, TrailerError> {
        TrailerParser::default().feed(buf)
    }

    #[test]
    fn no_trailers() {
        assert_eq!(
            httparse::Status::Complete(2),
            parse_trailers(b"\r\nrest").unwrap()
        );
    }

    #[test]
    fn several_trailers() {
        let buf = b"\
            hello: world\r\n\
            look:there\r\n\
            empty:\r\n\
            \r\n\
            rest";
        assert_eq!(
            httparse::Status::Complete(36),
            parse_trailers(buf).unwrap()
        );
    }

    #[test]
    fn trailing_whitespace() {
        assert_eq!(
            httparse::Status::Complete(17),
            parse_trailers(b"hello: world \r\n\r\n").unwrap()
        );
        assert_eq!(
            httparse::Status::Complete(25),
            parse_trailers(b"x-sum: a b\t \r\nempty: \r\n\r\n").unwrap()
        );
    }

    #[test]
    fn partial_trailers() {
        for buf in [
            &b"hello: world\r\nloo"[..],
            &b"hello: world\r\nlook: the"[..],
            &b"hello: world\r\n\r"[..],
            &b""[..],
        ] {
            assert_eq!(httparse::Status::Partial, parse_trailers(buf).unwrap());
        }
    }

    #[test]
    fn fed_in_pieces() {
        let buf = b"hello: world \r\nlook:there\r\n\r\nrest";
        for split in 0..buf.len() {
            let mut tp = TrailerParser::default();
            let (head, tail) = buf.split_at(split);
            let status = match tp.feed(head).unwrap() {
                httparse::Status::Complete(n) => n,
                httparse::Status::Partial => match tp.feed(tail).unwrap() {
                    httparse::Status::Complete(n) => head.len() + n,
                    httparse::Status::Partial => panic!("trailers never ended at {split}"),
                },
            };
            assert_eq!(buf.len() - 4, status, "split at {split}");
        }
    }

    #[test]
    fn invalid_trailers() {
        assert_eq!(
            TrailerError::InvalidFieldName,
            parse_trailers(b"he/llo: world\r\n\r\n").unwrap_err()
        );
        assert_eq!(
            TrailerError::InvalidFieldName,
            parse_trailers(b"hello : world\r\n\r\n").unwrap_err()
        );
        assert_eq!(
            TrailerError::InvalidFieldValue,
            parse_trailers(b"hello: world\rX\r\n").unwrap_err()
        );
        assert_eq!(
            TrailerError::InvalidFieldValue,
            parse_trailers(b"hello: wor\x7Fld\r\n\r\n").unwrap_err()
        );
        assert_eq!(
            TrailerError::InvalidTerminator,
            parse_trailers(b"\rX").unwrap_err()
        );
    }
}
