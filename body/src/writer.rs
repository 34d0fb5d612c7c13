use bodycheck_http_message::framing::FramingMode;
use tokio::io::AsyncWriteExt;

use crate::{BodyError, BodyResult};

/// Writes a body framed according to a [`FramingMode`].
#[derive(Debug)]
pub enum BodyWriter {
    FixedLength(ContentLengthBodyWriter),
    Chunked(ChunkedBodyWriter),
    /// The body is whatever gets written before the connection closes.
    UntilClose,
}

impl BodyWriter {
    pub fn for_mode(mode: FramingMode) -> Self {
        match mode {
            FramingMode::FixedLength(length) => {
                Self::FixedLength(ContentLengthBodyWriter::new(length))
            }
            FramingMode::Chunked => Self::Chunked(ChunkedBodyWriter::new()),
            FramingMode::UntilClose => Self::UntilClose,
        }
    }

    pub async fn write<I: AsyncWriteExt + Unpin>(
        &mut self,
        mut io: I,
        buf: &[u8],
    ) -> BodyResult<()> {
        match self {
            Self::FixedLength(w) => w.write(&mut io, buf).await,
            Self::Chunked(w) => w.write(&mut io, buf).await,
            Self::UntilClose => io.write_all(buf).await.map_err(BodyError::BodyWriteError),
        }
    }

    pub async fn finish<I: AsyncWriteExt + Unpin>(self, mut io: I) -> BodyResult<()> {
        match self {
            Self::FixedLength(w) => w.finish()?,
            Self::Chunked(w) => w.finish(&mut io).await?,
            Self::UntilClose => {}
        }
        io.flush().await.map_err(BodyError::BodyWriteError)?;
        Ok(())
    }

    /// Explicitly abandon a body. For chunked bodies this writes an invalid
    /// chunk-size line so that no reader can mistake the body for complete;
    /// for the other modes the caller just closes the connection.
    pub async fn abort<I: AsyncWriteExt + Unpin>(self, mut io: I) -> BodyResult<()> {
        if let Self::Chunked(w) = self {
            w.abort(&mut io).await?;
        }
        io.flush().await.map_err(BodyError::BodyWriteError)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ContentLengthBodyWriter {
    /// the total body length specified by the content-length header.
    length: u64,
    /// the amount of the body already written
    offset: u64,
}

impl ContentLengthBodyWriter {
    pub fn new(length: u64) -> Self {
        Self { length, offset: 0 }
    }

    pub async fn write<W: AsyncWriteExt + Unpin>(
        &mut self,
        mut io: W,
        buffer: &[u8],
    ) -> BodyResult<()> {
        let next_offset = self
            .offset
            .checked_add(buffer.len() as u64)
            .filter(|next| *next <= self.length)
            .ok_or(BodyError::BodyOverflow(self.length))?;

        io.write_all(buffer)
            .await
            .map_err(BodyError::BodyWriteError)?;
        self.offset = next_offset;
        Ok(())
    }

    pub fn finish(self) -> BodyResult<()> {
        let Self { length, offset } = self;
        debug_assert!(offset <= length, "offset exceeds length");
        if offset < length {
            return Err(BodyError::IncompleteBody {
                expected: length,
                actual: offset,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ChunkedBodyWriter {}

impl ChunkedBodyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn write<W: AsyncWriteExt + Unpin>(
        &mut self,
        mut io: W,
        buffer: &[u8],
    ) -> BodyResult<()> {
        if buffer.is_empty() {
            // a zero-length chunk would end the body
            return Ok(());
        }

        let chunk_header = format!("{:x}\r\n", buffer.len());
        io.write_all(chunk_header.as_bytes())
            .await
            .map_err(BodyError::BodyWriteError)?;
        io.write_all(buffer)
            .await
            .map_err(BodyError::BodyWriteError)?;
        io.write_all(b"\r\n")
            .await
            .map_err(BodyError::BodyWriteError)?;

        Ok(())
    }

    pub async fn finish<W: AsyncWriteExt + Unpin>(self, mut io: W) -> BodyResult<()> {
        io.write_all(b"0\r\n\r\n")
            .await
            .map_err(BodyError::BodyWriteError)
    }

    async fn abort<W: AsyncWriteExt + Unpin>(self, mut io: W) -> BodyResult<()> {
        // 'x' is not a hexadecimal digit, so the next chunk-size line is
        // malformed
        io.write_all(b"x").await.map_err(BodyError::BodyWriteError)
    }
}
