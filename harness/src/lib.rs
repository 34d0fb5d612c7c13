//! A deliberately misbehaving HTTP/1.1 server.
//!
//! [`FaultServer`] answers every connection with one [`Fixture`]: it reads and
//! logs a single request head, writes the fixture's bytes, and closes the
//! connection.

pub mod error;
pub mod fixture;
pub mod reader;
pub mod writer;

use std::net::SocketAddr;

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream, ToSocketAddrs},
};
use tracing::{debug, info, warn};

pub use crate::{
    error::{HarnessError, HarnessResult},
    fixture::Fixture,
};
use crate::reader::RequestReader;

pub struct FaultServer {
    listener: TcpListener,
    fixture: Fixture,
    max_head_length: usize,
}

impl FaultServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A, fixture: Fixture) -> HarnessResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(HarnessError::BindError)?;
        Ok(Self {
            listener,
            fixture,
            max_head_length: 8192,
        })
    }

    pub fn local_addr(&self) -> HarnessResult<SocketAddr> {
        self.listener.local_addr().map_err(HarnessError::BindError)
    }

    pub fn fixture(&self) -> Fixture {
        self.fixture
    }

    /// Accept and answer exactly one connection.
    pub async fn serve_one(&self) -> HarnessResult<()> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(HarnessError::AcceptError)?;
        respond(stream, peer, self.fixture, self.max_head_length).await
    }

    /// Answer connections until accepting fails, one task per connection.
    pub async fn serve(self) -> HarnessResult<()> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(HarnessError::AcceptError)?;
            let fixture = self.fixture;
            let max_head_length = self.max_head_length;
            tokio::spawn(async move {
                if let Err(e) = respond(stream, peer, fixture, max_head_length).await {
                    warn!(%peer, error = %e, "connection failed");
                }
            });
        }
    }
}

async fn respond(
    mut stream: TcpStream,
    peer: SocketAddr,
    fixture: Fixture,
    max_head_length: usize,
) -> HarnessResult<()> {
    let req = RequestReader::new(&mut stream, max_head_length)
        .read()
        .await?;
    info!(
        %peer,
        method = %String::from_utf8_lossy(req.method()),
        path = %String::from_utf8_lossy(req.path()),
        "request received"
    );
    debug!(%peer, headers = ?req.headers(), "request headers");

    fixture.write_to(&mut stream).await?;
    stream.shutdown().await.map_err(HarnessError::WriteError)?;
    info!(%peer, %fixture, "response sent");
    Ok(())
}

#[cfg(test)]
mod test {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    use crate::{FaultServer, Fixture};

    async fn exchange(fixture: Fixture) -> Vec<u8> {
        let server = FaultServer::bind("127.0.0.1:0", fixture).await.unwrap();
        let addr = server.local_addr().unwrap();
        let serve = tokio::spawn(async move { server.serve_one().await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        serve.await.unwrap().unwrap();
        response
    }

    #[tokio::test]
    async fn serves_fixture_then_closes() {
        let response = exchange(Fixture::ShortContentLength).await;
        assert_eq!(
            &b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n123456"[..],
            response
        );
    }

    #[tokio::test]
    async fn serves_well_formed_fixture() {
        let response = exchange(Fixture::Hello).await;
        assert_eq!(
            &b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\nhello"[..],
            response
        );
    }

    #[tokio::test]
    async fn serve_many() {
        let server = FaultServer::bind("127.0.0.1:0", Fixture::Chunked)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        assert_eq!(Fixture::Chunked, server.fixture());
        let serve = tokio::spawn(server.serve());

        for _ in 0..3 {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            assert!(response.ends_with(b"0\r\n\r\n"));
        }
        serve.abort();
    }
}
