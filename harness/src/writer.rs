//! Writes responses the way a well-behaved server would, with a framing
//! header chosen to match the body writer.
//!
//! ```rust
//! use bodycheck_harness::writer::ResponseWriter;
//! use bodycheck_http_message::message::ResponseBuilder;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut buf = Vec::new();
//!
//!     let res = ResponseBuilder::new(0).build();
//!     let mut body = ResponseWriter::new(&mut buf)
//!         .send_as_chunked(&res)
//!         .await
//!         .unwrap();
//!     body.write(b"abc").await.unwrap();
//!     body.write(b"de").await.unwrap();
//!     body.finish().await.unwrap();
//!
//!     assert_eq!(
//!         b"\
//!             HTTP/1.1 200 OK\r\n\
//!             transfer-encoding: chunked\r\n\
//!             \r\n\
//!             3\r\n\
//!             abc\r\n\
//!             2\r\n\
//!             de\r\n\
//!             0\r\n\
//!             \r\n\
//!             ",
//!         &buf[..]
//!     );
//! }
//! ```

use bodycheck_body::BodyWriter;
use bodycheck_http_message::{framing::FramingMode, message::Response};
use tokio::io::{self, AsyncWriteExt};

use crate::error::{HarnessError, HarnessResult};

#[derive(Debug)]
pub struct ResponseWriter<I> {
    io: I,
}

impl<I: AsyncWriteExt + Unpin> ResponseWriter<I> {
    pub fn new(io: I) -> Self {
        Self { io }
    }

    pub async fn send_as_content_length(
        self,
        response: &Response,
        body_len: u64,
    ) -> HarnessResult<ResponseBodyWriter<I>> {
        self.send(response, FramingMode::FixedLength(body_len)).await
    }

    pub async fn send_as_chunked(self, response: &Response) -> HarnessResult<ResponseBodyWriter<I>> {
        self.send(response, FramingMode::Chunked).await
    }

    /// Send the head without any framing header. The body ends when the
    /// connection closes.
    pub async fn send_until_close(
        self,
        response: &Response,
    ) -> HarnessResult<ResponseBodyWriter<I>> {
        self.send(response, FramingMode::UntilClose).await
    }

    async fn send(self, response: &Response, mode: FramingMode) -> HarnessResult<ResponseBodyWriter<I>> {
        let Self { mut io } = self;
        write_response_to(response, mode, &mut io)
            .await
            .map_err(HarnessError::WriteError)?;
        Ok(ResponseBodyWriter {
            io,
            state: BodyWriter::for_mode(mode),
        })
    }

    /// Write bytes exactly as given, with no framing of any kind.
    pub async fn send_raw(mut self, raw: &[u8]) -> HarnessResult<I> {
        self.io
            .write_all(raw)
            .await
            .map_err(HarnessError::WriteError)?;
        self.io.flush().await.map_err(HarnessError::WriteError)?;
        Ok(self.io)
    }
}

fn is_framing_header(name: &[u8]) -> bool {
    name.eq_ignore_ascii_case(b"content-length") || name.eq_ignore_ascii_case(b"transfer-encoding")
}

async fn write_response_to<W: AsyncWriteExt + Unpin>(
    res: &Response,
    mode: FramingMode,
    mut w: W,
) -> io::Result<()> {
    let code = format!("{:03}", res.code());

    // status line
    w.write_all(res.version().to_static().as_bytes()).await?;
    w.write_all(b" ").await?;
    w.write_all(code.as_bytes()).await?;
    w.write_all(b" ").await?;
    w.write_all(res.reason()).await?;
    w.write_all(b"\r\n").await?;

    // the framing header always comes from `mode`
    let headers = res.headers().iter().filter(|(n, _)| !is_framing_header(n));
    for (n, v) in headers {
        w.write_all(n).await?;
        w.write_all(b": ").await?;
        w.write_all(v).await?;
        w.write_all(b"\r\n").await?;
    }

    match mode {
        FramingMode::FixedLength(l) => {
            let cl = format!("content-length: {l}\r\n");
            w.write_all(cl.as_bytes()).await?;
        }
        FramingMode::Chunked => {
            w.write_all(b"transfer-encoding: chunked\r\n").await?;
        }
        FramingMode::UntilClose => {}
    }

    w.write_all(b"\r\n").await?;
    Ok(())
}

pub struct ResponseBodyWriter<I> {
    io: I,
    state: BodyWriter,
}

impl<I: AsyncWriteExt + Unpin> ResponseBodyWriter<I> {
    pub async fn write(&mut self, buf: &[u8]) -> HarnessResult<()> {
        self.state
            .write(&mut self.io, buf)
            .await
            .map_err(HarnessError::BodyWriteError)
    }

    /// End the body properly.
    pub async fn finish(self) -> HarnessResult<I> {
        let Self { mut io, state } = self;
        state
            .finish(&mut io)
            .await
            .map_err(HarnessError::BodyWriteError)?;
        Ok(io)
    }

    /// Abandon the body so that no reader can take it for complete.
    pub async fn abort(self) -> HarnessResult<I> {
        let Self { mut io, state } = self;
        state
            .abort(&mut io)
            .await
            .map_err(HarnessError::BodyWriteError)?;
        Ok(io)
    }
}
