use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::core::{Error, Result};

/// One owned bidirectional text-stream connection to an endpoint.
///
/// The I/O timeout given at connect time bounds every subsequent call for the
/// life of the handle. The handle is owned exclusively by its caller and is
/// dropped (closed) on any I/O error or at shutdown; it is never shared.
pub struct Connection {
    /// The underlying stream
    stream: TcpStream,
    /// Display name used in log lines
    peer: String,
    /// Per-call bound for connect/read/write
    io_timeout: Duration,
}

impl Connection {
    /// Opens a connection, bounded by `io_timeout`. Refusal, unreachable
    /// hosts and timeouts all surface as [`Error::Connect`].
    pub async fn connect(host: &str, port: u16, name: &str, io_timeout: Duration) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        info!("Connecting to {} at {} ...", name, addr);
        let stream = timeout(io_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::connect(format!("{}: connect to {} timed out", name, addr)))?
            .map_err(|e| Error::connect(format!("{}: {}: {}", name, addr, e)))?;
        info!("Connected to {}.", name);
        Ok(Connection {
            stream,
            peer: name.to_string(),
            io_timeout,
        })
    }

    /// Writes one line, appending the trailing newline if absent
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut buf = line.to_string();
        if !buf.ends_with('\n') {
            buf.push('\n');
        }
        debug!("TX -> {}: {}", self.peer, buf.trim_end());
        timeout(self.io_timeout, self.stream.write_all(buf.as_bytes()))
            .await
            .map_err(|_| Error::timed_out(format!("{}: write timed out", self.peer)))??;
        Ok(())
    }

    /// Reads up to `max_bytes` in a single read and decodes it lossily.
    ///
    /// This is best-effort, not a framed read-until-newline: a short or
    /// partial reply is normal protocol noise and the tolerant frequency
    /// parser deals with it. A zero-byte read means the peer closed the
    /// connection and surfaces as an I/O error.
    pub async fn receive_line(&mut self, max_bytes: usize) -> Result<String> {
        let mut buf = vec![0u8; max_bytes];
        let n = timeout(self.io_timeout, self.stream.read(&mut buf))
            .await
            .map_err(|_| Error::timed_out(format!("{}: read timed out", self.peer)))??;
        if n == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                format!("{}: connection closed by peer", self.peer),
            )));
        }
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
        debug!("RX <- {}: {}", self.peer, text.trim_end());
        Ok(text)
    }

    /// Best-effort close; never fails
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
        debug!("Closed connection to {}.", self.peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const TEST_TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn test_connect_send_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = sock.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"f\n");
            sock.write_all(b"14250000\n").await.unwrap();
        });

        let mut conn = Connection::connect("127.0.0.1", addr.port(), "test", TEST_TIMEOUT)
            .await
            .unwrap();
        conn.send_line("f").await.unwrap();
        let reply = conn.receive_line(1024).await.unwrap();
        assert_eq!(reply, "14250000\n");
        conn.close().await;

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_line_appends_newline_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = sock.read(&mut buf).await.unwrap();
            buf[..n].to_vec()
        });

        let mut conn = Connection::connect("127.0.0.1", addr.port(), "test", TEST_TIMEOUT)
            .await
            .unwrap();
        conn.send_line("F 7074000\n").await.unwrap();
        conn.close().await;

        assert_eq!(server.await.unwrap(), b"F 7074000\n");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = Connection::connect("127.0.0.1", addr.port(), "test", TEST_TIMEOUT)
            .await
            .map(|_| ());
        assert!(matches!(result, Err(Error::Connect(_))));
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut conn = Connection::connect("127.0.0.1", addr.port(), "test", TEST_TIMEOUT)
            .await
            .unwrap();
        // Server accepted but never replies
        let (_sock, _) = listener.accept().await.unwrap();
        let err = conn.receive_line(1024).await.unwrap_err();
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_receive_eof_is_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut conn = Connection::connect("127.0.0.1", addr.port(), "test", TEST_TIMEOUT)
            .await
            .unwrap();
        let (sock, _) = listener.accept().await.unwrap();
        drop(sock);

        let err = conn.receive_line(1024).await.unwrap_err();
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_receive_tolerates_undecodable_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"\xff\xfe 7074000\n").await.unwrap();
        });

        let mut conn = Connection::connect("127.0.0.1", addr.port(), "test", TEST_TIMEOUT)
            .await
            .unwrap();
        let reply = conn.receive_line(1024).await.unwrap();
        assert!(reply.contains("7074000"));
        conn.close().await;

        server.await.unwrap();
    }
}
