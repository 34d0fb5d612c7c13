use bodycheck_http_message::message::Request;
use bodycheck_util::buffer::Buffer;
use bytes::BytesMut;
use tokio::io::AsyncReadExt;

use crate::error::{HarnessError, HarnessResult};

/// Reads a single request head. Any request body is left unread.
pub struct RequestReader<I> {
    io: I,
    max_head_length: usize,
    buffer: Buffer,
}

impl<I: AsyncReadExt + Unpin> RequestReader<I> {
    const MAX_HEADERS: usize = 256;

    pub fn new(io: I, max_head_length: usize) -> Self {
        Self {
            io,
            max_head_length,
            buffer: Buffer::new(BytesMut::new()),
        }
    }

    pub async fn read(mut self) -> HarnessResult<Request> {
        loop {
            if let Some(req) = Request::parse(&mut self.buffer, Self::MAX_HEADERS)
                .map_err(HarnessError::HttpRequestParseError)?
            {
                return Ok(req);
            } else if self.buffer.len() >= self.max_head_length {
                return Err(HarnessError::MaxHeadLenExceeded(
                    self.buffer.len(),
                    self.max_head_length,
                ));
            }

            let first_read = self.buffer.is_empty();

            let target_read_len = self.max_head_length.saturating_sub(self.buffer.len());
            let len = self
                .buffer
                .read_from(&mut self.io, target_read_len)
                .await
                .map_err(HarnessError::ReadError)?;
            if 0 == len {
                return if first_read {
                    Err(HarnessError::FirstReadEOF)
                } else {
                    Err(HarnessError::UnexpectedEOF)
                };
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;

    use crate::{error::HarnessError, reader::RequestReader};

    #[tokio::test]
    async fn read_get() {
        let input = b"\
            GET /fixture HTTP/1.1\r\n\
            Host: localhost:8080\r\n\
            Accept-Encoding: gzip\r\n\
            \r\n";
        let req = RequestReader::new(&input[..], 8192).read().await.unwrap();
        assert_eq!(&b"GET"[..], req.method());
        assert_eq!(&b"/fixture"[..], req.path());
        assert_eq!(&b"gzip"[..], req.get_header("accept-encoding").unwrap());
    }

    #[tokio::test]
    async fn closed_without_request() {
        let err = RequestReader::new(&b""[..], 8192).read().await.unwrap_err();
        assert!(matches!(err, HarnessError::FirstReadEOF));

        let err = RequestReader::new(&b"GET / HT"[..], 8192)
            .read()
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::UnexpectedEOF));
    }

    #[tokio::test]
    async fn trickle_request() {
        let (mut left, right) = tokio::io::duplex(2);

        let w = tokio::spawn(async move {
            for c in b"GET / HTTP/1.1\r\nhost: x\r\n\r\n".chunks(3) {
                tokio::time::sleep(Duration::from_millis(2)).await;
                left.write_all(c).await.unwrap();
            }
            left
        });

        let req = RequestReader::new(right, 8192).read().await.unwrap();
        assert_eq!(&b"/"[..], req.path());
        drop(w.await.unwrap());
    }
}
