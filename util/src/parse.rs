//! Byte-level helpers for the few header grammars bodycheck cares about.

/// RFC 9110 `tchar`, the characters allowed in a token such as a field name.
pub const fn is_tchar(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'A'..=b'Z'
            | b'a'..=b'z'
    )
}

/// RFC 9110 `field-vchar`: VCHAR or obs-text.
pub const fn is_field_vchar(byte: u8) -> bool {
    matches!(byte, 0x21..=0x7E | 0x80..=0xFF)
}

/// RFC 9110 `OWS` characters.
pub const fn is_ows(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// Parse a `Content-Length` value. Only plain decimal digits are accepted, so
/// signs, embedded whitespace, and lists like `5, 5` are rejected.
pub fn parse_content_length(value: &[u8]) -> Option<u64> {
    let value = value.trim_ascii();
    if value.is_empty() {
        return None;
    }
    value.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}

/// The last element of a comma-separated field value such as
/// `Transfer-Encoding: gzip, chunked`, with surrounding whitespace removed.
pub fn last_list_element(value: &[u8]) -> &[u8] {
    value
        .rsplit(|&b| b == b',')
        .next()
        .unwrap_or(value)
        .trim_ascii()
}

#[cfg(test)]
mod test {
    use super::{is_field_vchar, is_tchar, last_list_element, parse_content_length};

    #[test]
    fn tchar() {
        let punct = b"!#$%&'*+-.^_`|~".to_vec();
        let all = punct
            .iter()
            .copied()
            .chain(b'0'..=b'9')
            .chain(b'a'..=b'z')
            .chain(b'A'..=b'Z')
            .collect::<Vec<u8>>();

        for b in 0u8..=255 {
            assert_eq!(all.contains(&b), is_tchar(b), "byte {b:#04x}");
        }
    }

    #[test]
    fn field_vchar() {
        for b in 0u8..=255 {
            let bad = b <= 0x20 || b == 0x7F;
            assert_eq!(!bad, is_field_vchar(b), "byte {b:#04x}");
        }
    }

    #[test]
    fn content_length() {
        assert_eq!(Some(10), parse_content_length(b"10"));
        assert_eq!(Some(0), parse_content_length(b" 0 "));
        assert_eq!(None, parse_content_length(b""));
        assert_eq!(None, parse_content_length(b"+5"));
        assert_eq!(None, parse_content_length(b"-1"));
        assert_eq!(None, parse_content_length(b"5, 5"));
        assert_eq!(None, parse_content_length(b"18446744073709551616"));
    }

    #[test]
    fn list_element() {
        assert_eq!(b"chunked", last_list_element(b"chunked"));
        assert_eq!(b"chunked", last_list_element(b"gzip, chunked "));
        assert_eq!(b"gzip", last_list_element(b"chunked,gzip"));
    }
}
