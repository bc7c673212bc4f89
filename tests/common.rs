//! Test utilities & fixtures.
//!
//! Spins up an in-process server on an ephemeral port and provides a small
//! line-level client over a real TCP stream.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use wireboard::board::raster::Raster;
use wireboard::board::WhiteboardServer;
use wireboard::config::Config;

/// Small canvas keeps the WHITEBOARD snapshot lines readable in failures.
pub const CANVAS_WIDTH: u32 = 16;
pub const CANVAS_HEIGHT: u32 = 12;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind a server on 127.0.0.1:0, run its accept loop in the background, and
/// return the address to connect to.
pub async fn spawn_server() -> SocketAddr {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.canvas.width = CANVAS_WIDTH;
    config.canvas.height = CANVAS_HEIGHT;

    let server = WhiteboardServer::bind(&config).await.expect("bind server");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

/// The base64 snapshot an untouched board serves.
#[allow(dead_code)]
pub fn blank_snapshot() -> String {
    Raster::new(CANVAS_WIDTH, CANVAS_HEIGHT).to_base64()
}

/// One protocol client speaking newline-delimited text.
pub struct TestClient {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, writer) = stream.into_split();
        TestClient {
            reader: BufReader::new(read_half).lines(),
            writer,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("write line");
        self.writer.write_all(b"\n").await.expect("write newline");
    }

    /// Next line from the server; panics on timeout or closed connection.
    pub async fn recv(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.reader.next_line())
            .await
            .expect("timed out waiting for a server line")
            .expect("read from server")
            .expect("server closed the connection")
    }

    /// Wait for the server to close this connection.
    #[allow(dead_code)]
    pub async fn expect_eof(&mut self) {
        let next = tokio::time::timeout(RECV_TIMEOUT, self.reader.next_line())
            .await
            .expect("timed out waiting for EOF")
            .expect("read from server");
        assert_eq!(next, None, "expected the server to close the connection");
    }
}
