use bytes::Bytes;

/// The position of a sub-slice within a parse buffer, so that the slice can
/// be cut out of the frozen buffer after the parser's borrow ends.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Span {
    offset: usize,
    len: usize,
}

impl Span {
    /// Returns `None` if `inner` does not lie within `outer`.
    pub(crate) fn new(outer: &[u8], inner: &[u8]) -> Option<Self> {
        let len = inner.len();
        let outer = outer.as_ptr_range();
        let inner = inner.as_ptr_range();
        if outer.start <= inner.start && inner.end <= outer.end {
            let offset = inner.start as usize - outer.start as usize;
            Some(Self { offset, len })
        } else {
            None
        }
    }

    /// Like [`Span::new`], but an `inner` slice that does not come from
    /// `outer` (e.g. a static empty reason phrase) becomes an empty span.
    pub(crate) fn new_or_empty(outer: &[u8], inner: &[u8]) -> Self {
        Self::new(outer, inner).unwrap_or_default()
    }

    pub(crate) fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }

    /// # Panics
    ///
    /// Panics if the span falls outside of `buf`.
    pub(crate) fn slice_from(&self, buf: &Bytes) -> Bytes {
        buf.slice(self.range())
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::Span;

    #[test]
    fn span_from_slices() {
        let outer = &[0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert!(Span::new(outer, &outer[1..4]).is_some());
        assert!(Span::new(&[], outer).is_none());
        assert!(Span::new(&outer[2..], &outer[1..]).is_none());
    }

    #[test]
    fn foreign_slice_is_empty() {
        let outer = Bytes::from_static(b"0123");
        let span = Span::new_or_empty(&outer, b"xyz");
        assert!(span.slice_from(&outer).is_empty());
        let span = Span::new_or_empty(&outer, &outer[1..3]);
        assert_eq!(&b"12"[..], span.slice_from(&outer));
    }
}
