/// Formats bytes as an escaped ASCII string, for logging wire data that may
/// not be valid UTF-8. Output past `limit` bytes is elided.
#[derive(PartialEq)]
pub struct AsciiDebug<'s> {
    bytes: &'s [u8],
    limit: usize,
}

impl<'s> AsciiDebug<'s> {
    const DEFAULT_LIMIT: usize = 64;

    pub fn new(bytes: &'s [u8]) -> Self {
        Self::with_limit(bytes, Self::DEFAULT_LIMIT)
    }

    pub fn with_limit(bytes: &'s [u8], limit: usize) -> Self {
        Self { bytes, limit }
    }
}

impl<'s> std::fmt::Debug for AsciiDebug<'s> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = self.bytes.len().min(self.limit);
        write!(f, "\"")?;
        for b in &self.bytes[..shown] {
            for c in std::ascii::escape_default(*b) {
                write!(f, "{}", c as char)?;
            }
        }
        write!(f, "\"")?;
        if shown < self.bytes.len() {
            write!(f, "...(+{} bytes)", self.bytes.len() - shown)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::AsciiDebug;

    #[test]
    fn ascii() {
        let i = [b'a', b'b', 0, b'c', b'\r', b'\n'];
        assert_eq!("\"ab\\x00c\\r\\n\"", format!("{:?}", AsciiDebug::new(&i)));
    }

    #[test]
    fn elides_past_limit() {
        let i = b"0123456789";
        assert_eq!(
            "\"0123\"...(+6 bytes)",
            format!("{:?}", AsciiDebug::with_limit(i, 4))
        );
    }
}
