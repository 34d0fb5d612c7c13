use std::io;

use tokio::io::AsyncReadExt;

use bytes::{Buf, BytesMut};

/// Bytes read off a stream but not yet claimed by a parser. Dereferences to
/// the unclaimed bytes.
#[derive(Debug, Default)]
pub struct Buffer(BytesMut);

impl std::ops::Deref for Buffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Buffer {
    pub fn new(buffer: BytesMut) -> Self {
        Self(buffer)
    }

    /// Claim the first `at` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `at` is larger than the number of buffered bytes.
    #[inline]
    pub fn split_to(&mut self, at: usize) -> BytesMut {
        self.0.split_to(at)
    }

    /// Claim every buffered byte.
    #[inline]
    pub fn split(&mut self) -> BytesMut {
        self.0.split()
    }

    /// Read some data from `io`. The internal buffer will be expanded to
    /// accomodate at least `target_read_len` new bytes, and a single read from
    /// `io` will be attempted. Returns the number of bytes read, where `0`
    /// means `io` is closed.
    pub async fn read_from<I: AsyncReadExt + Unpin>(
        &mut self,
        mut io: I,
        target_read_len: usize,
    ) -> io::Result<usize> {
        let mut r = ReadLimitedBytes::new(&mut self.0, target_read_len);
        io.read_buf(&mut r).await
    }

    #[inline]
    pub fn into_inner(self) -> BytesMut {
        let Self(b) = self;
        b
    }

    #[inline]
    pub fn try_get_u8(&mut self) -> Result<u8, bytes::TryGetError> {
        self.0.try_get_u8()
    }
}

/// Limits how many bytes a single read may place into a [`BytesMut`]. The
/// [`bytes::BufMut`] impl on [`BytesMut`] grows without bound, which would let
/// one read pull in bytes belonging to whatever follows the current message.
struct ReadLimitedBytes<'b> {
    max_read: usize,
    position: usize,
    buf: &'b mut BytesMut,
}

impl<'b> ReadLimitedBytes<'b> {
    fn new(buf: &'b mut BytesMut, max_read: usize) -> Self {
        buf.reserve(max_read);
        Self {
            max_read,
            position: 0,
            buf,
        }
    }
}

unsafe impl<'b> bytes::BufMut for ReadLimitedBytes<'b> {
    fn remaining_mut(&self) -> usize {
        self.max_read.saturating_sub(self.position)
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        let new_position = self.position + cnt;
        if new_position > self.max_read {
            panic!("advancing past max_read");
        }
        self.position = new_position;
        unsafe { self.buf.advance_mut(cnt) }
    }

    fn chunk_mut(&mut self) -> &mut bytes::buf::UninitSlice {
        let rem = self.remaining_mut();
        &mut self.buf.chunk_mut()[0..rem]
    }
}
