// TLS channel: a socket whose encryption is negotiated by the external TLS
// stack. Session and certificate handling live outside the transport layer;
// this type models the wrapped socket so handles carry the right variant
// label and socket-like behavior.
use crate::tcp::TcpChannel;
use crate::traits::Channel;
use std::io::Result;
use std::net::TcpStream;
use std::time::Duration;

use vio_core::{Direction, IoEvent};

pub struct TlsChannel {
    inner: TcpChannel,
}

impl TlsChannel {
    /// Wrap a stream whose TLS session has already been established
    pub fn from_stream(stream: TcpStream) -> Self {
        TlsChannel {
            inner: TcpChannel::from_stream(stream),
        }
    }
}

impl Channel for TlsChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.inner.write(data)
    }

    fn connect(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.inner.connect(timeout)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown()
    }

    fn set_keepalive(&mut self, enable: bool) -> Result<()> {
        self.inner.set_keepalive(enable)
    }

    fn fast_send(&mut self) -> Result<()> {
        self.inner.fast_send()
    }

    fn io_wait(&mut self, event: IoEvent, timeout: Option<Duration>) -> Result<bool> {
        self.inner.io_wait(event, timeout)
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn was_timeout(&self) -> bool {
        self.inner.was_timeout()
    }

    fn should_retry(&self) -> bool {
        self.inner.should_retry()
    }

    fn peer_addr(&self) -> Result<String> {
        self.inner.peer_addr()
    }

    fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.inner.set_blocking(blocking)
    }

    fn is_blocking(&self) -> bool {
        self.inner.is_blocking()
    }

    fn set_timeout(&mut self, direction: Direction, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_timeout(direction, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpListener;

    #[test]
    fn wrapped_stream_behaves_like_a_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"sealed").unwrap();
        });

        let stream = std::net::TcpStream::connect(addr).unwrap();
        let mut chan = TlsChannel::from_stream(stream);
        assert!(chan.is_connected());
        chan.set_keepalive(true).unwrap();
        chan.fast_send().unwrap();

        let mut collected = Vec::new();
        let mut buf = [0u8; 6];
        while collected.len() < 6 {
            let n = chan.read(&mut buf).unwrap();
            assert!(n > 0);
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"sealed");

        server.join().unwrap();
        chan.shutdown().unwrap();
        assert!(!chan.is_connected());
    }
}
