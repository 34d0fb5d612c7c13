use bodycheck_http_message::message::Request;
use tokio::io::{self, AsyncWriteExt};

use crate::error::{ClientError, ClientResult};

/// Writes a bodyless request head.
pub struct RequestWriter<I> {
    io: I,
}

impl<I: AsyncWriteExt + Unpin> RequestWriter<I> {
    pub fn new(io: I) -> Self {
        Self { io }
    }

    pub async fn send(&mut self, request: &Request) -> ClientResult<()> {
        write_request_to(request, &mut self.io)
            .await
            .map_err(ClientError::WriteError)
    }

    /// Signal that no more request bytes are coming.
    pub async fn shutdown(mut self) -> ClientResult<I> {
        self.io.shutdown().await.map_err(ClientError::WriteError)?;
        Ok(self.io)
    }

    pub fn into_inner(self) -> I {
        let Self { io } = self;
        io
    }
}

async fn write_request_to<W: AsyncWriteExt + Unpin>(req: &Request, mut w: W) -> io::Result<()> {
    // request line
    w.write_all(req.method()).await?;
    w.write_all(b" ").await?;
    w.write_all(req.path()).await?;
    w.write_all(b" ").await?;
    w.write_all(req.version().to_static().as_bytes()).await?;
    w.write_all(b"\r\n").await?;

    for (n, v) in req.headers().iter() {
        w.write_all(n).await?;
        w.write_all(b": ").await?;
        w.write_all(v).await?;
        w.write_all(b"\r\n").await?;
    }

    w.write_all(b"\r\n").await?;
    w.flush().await?;

    Ok(())
}
