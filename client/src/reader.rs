use std::time::Duration;

use bodycheck_body::BodyReader;
use bodycheck_http_message::{framing::FramingMode, message::Response};
use bodycheck_util::buffer::Buffer;
use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::{
    CheckConfig,
    error::{ClientError, ClientResult, HeadError},
};

pub struct ResponseReader<I> {
    io: I,
    buffer: Buffer,
    max_head_length: usize,
    max_headers: usize,
    read_timeout: Option<Duration>,
}

impl<I: AsyncReadExt + Unpin> ResponseReader<I> {
    pub fn new(io: I, config: &CheckConfig) -> Self {
        Self {
            io,
            buffer: Buffer::new(BytesMut::new()),
            max_head_length: config.max_head_length,
            max_headers: config.max_headers,
            read_timeout: config.read_timeout,
        }
    }

    async fn head(&mut self) -> ClientResult<Response> {
        loop {
            if let Some(res) =
                Response::parse(&mut self.buffer, self.max_headers).map_err(HeadError::Parse)?
            {
                return Ok(res);
            } else if self.buffer.len() >= self.max_head_length {
                return Err(
                    HeadError::MaxHeadLenExceeded(self.buffer.len(), self.max_head_length).into(),
                );
            }

            let first_read = self.buffer.is_empty();

            // read some data into the buffer
            let target_read_len = self.max_head_length.saturating_sub(self.buffer.len());
            let read = self.buffer.read_from(&mut self.io, target_read_len);
            let len = match self.read_timeout {
                None => read.await,
                Some(limit) => tokio::time::timeout(limit, read)
                    .await
                    .map_err(|_elapsed| HeadError::TimedOut(limit))?,
            }
            .map_err(ClientError::ReadError)?;
            if 0 == len {
                return Err(if first_read {
                    HeadError::ClosedBeforeResponse
                } else {
                    HeadError::UnexpectedEof
                }
                .into());
            }
        }
    }

    /// Read up to the final response head, skipping interim `1xx` responses,
    /// and select how its body is framed.
    ///
    /// `allow_body` should be false when the response cannot carry a body
    /// whatever its headers say, as with a response to `HEAD`.
    pub async fn read(mut self, allow_body: bool) -> ClientResult<ClientResponse<I>> {
        let res = loop {
            let res = self.head().await?;
            match res.is_informational() {
                Some(101) => return Err(HeadError::SwitchingProtocols.into()),
                Some(code) => debug!(code, "skipping interim response"),
                None => break res,
            }
        };

        let framing = res.framing().map_err(HeadError::from)?;
        let mode = if allow_body {
            framing
        } else {
            FramingMode::FixedLength(0)
        };
        debug!(code = res.code(), %mode, "response head read");
        if mode.is_until_close() {
            warn!("response has no declared length, reading until close");
        }

        let Self {
            io,
            buffer,
            read_timeout,
            ..
        } = self;
        let body = BodyReader::new(io, buffer.into_inner(), mode).with_read_timeout(read_timeout);
        Ok(ClientResponse { res, body })
    }
}

/// A final response head and a reader positioned at its body.
pub struct ClientResponse<I> {
    res: Response,
    body: BodyReader<I>,
}

impl<I> ClientResponse<I> {
    pub fn res(&self) -> &Response {
        &self.res
    }

    pub fn mode(&self) -> FramingMode {
        self.body.mode()
    }

    pub fn into_parts(self) -> (Response, BodyReader<I>) {
        let Self { res, body } = self;
        (res, body)
    }
}

impl<I> std::fmt::Debug for ClientResponse<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientResponse")
            .field("res", &self.res)
            .field("progress", &self.body.progress())
            .finish()
    }
}
