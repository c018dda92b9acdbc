// TCP/IP channel implementation
use crate::traits::{is_retry_kind, is_timeout_kind, poll_ready, Channel};
use std::io::{ErrorKind, Read, Result, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::os::fd::AsFd;
use std::time::Duration;

use nix::sys::socket::{setsockopt, sockopt};
use vio_core::{Direction, IoEvent};

pub struct TcpChannel {
    address: String,
    stream: Option<TcpStream>,
    blocking: bool,
    last_error: Option<ErrorKind>,
}

impl TcpChannel {
    pub fn new(address: &str) -> Self {
        TcpChannel {
            address: address.to_string(),
            stream: None,
            blocking: true,
            last_error: None,
        }
    }

    /// Adopt an already-accepted stream (server side)
    pub fn from_stream(stream: TcpStream) -> Self {
        let address = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        TcpChannel {
            address,
            stream: Some(stream),
            blocking: true,
            last_error: None,
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(|| {
            std::io::Error::new(ErrorKind::NotConnected, "Not connected")
        })
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.kind()),
        }
        result
    }
}

impl Channel for TcpChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let result = self.stream()?.read(buf);
        self.track(result)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let result = self.stream()?.write(data);
        self.track(result)
    }

    fn connect(&mut self, timeout: Option<Duration>) -> Result<()> {
        let stream = match timeout {
            Some(d) => {
                let addr = self.address.to_socket_addrs()?.next().ok_or_else(|| {
                    std::io::Error::new(ErrorKind::InvalidInput, "No address resolved")
                })?;
                TcpStream::connect_timeout(&addr, d)
            }
            None => TcpStream::connect(&self.address),
        };
        let stream = self.track(stream)?;
        stream.set_nonblocking(!self.blocking)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(ref stream) = self.stream {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.stream = None;
        Ok(())
    }

    fn set_keepalive(&mut self, enable: bool) -> Result<()> {
        let stream = self.stream()?;
        setsockopt(stream, sockopt::KeepAlive, &enable)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
    }

    fn fast_send(&mut self) -> Result<()> {
        let stream = self.stream()?;
        setsockopt(stream, sockopt::TcpNoDelay, &true)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
    }

    fn io_wait(&mut self, event: IoEvent, timeout: Option<Duration>) -> Result<bool> {
        let stream = self.stream()?;
        poll_ready(stream.as_fd(), event, timeout)
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn was_timeout(&self) -> bool {
        self.last_error.map_or(false, is_timeout_kind)
    }

    fn should_retry(&self) -> bool {
        self.last_error.map_or(false, is_retry_kind)
    }

    fn peer_addr(&self) -> Result<String> {
        match self.stream {
            Some(ref stream) => Ok(stream.peer_addr()?.to_string()),
            None => Err(std::io::Error::new(
                ErrorKind::NotConnected,
                "Not connected",
            )),
        }
    }

    fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.blocking = blocking;
        if let Some(ref stream) = self.stream {
            stream.set_nonblocking(!blocking)?;
        }
        Ok(())
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn set_timeout(&mut self, direction: Direction, timeout: Option<Duration>) -> Result<()> {
        let stream = self.stream()?;
        match direction {
            Direction::Read => stream.set_read_timeout(timeout),
            Direction::Write => stream.set_write_timeout(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpListener;

    #[test]
    fn dial_configure_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"hi").unwrap();
        });

        let mut chan = TcpChannel::new(&addr);
        assert!(!chan.is_connected());
        chan.connect(Some(Duration::from_secs(5))).unwrap();
        assert!(chan.is_connected());
        assert_eq!(chan.peer_addr().unwrap(), addr);

        chan.set_keepalive(true).unwrap();
        chan.fast_send().unwrap();

        assert!(chan.io_wait(IoEvent::Write, Some(Duration::ZERO)).unwrap());
        assert!(chan.io_wait(IoEvent::Read, Some(Duration::from_secs(5))).unwrap());

        let mut collected = Vec::new();
        let mut buf = [0u8; 2];
        while collected.len() < 2 {
            let n = chan.read(&mut buf).unwrap();
            assert!(n > 0);
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"hi");
        assert!(!chan.was_timeout());

        server.join().unwrap();
        chan.shutdown().unwrap();
        assert!(!chan.is_connected());
    }

    #[test]
    fn read_timeout_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut chan = TcpChannel::new(&addr);
        chan.connect(None).unwrap();
        let (_held, _) = listener.accept().unwrap();

        chan.set_timeout(Direction::Read, Some(Duration::from_millis(20)))
            .unwrap();
        let mut buf = [0u8; 4];
        assert!(chan.read(&mut buf).is_err());
        assert!(chan.was_timeout());
        assert!(chan.should_retry());
    }

    #[test]
    fn operations_without_a_stream_report_not_connected() {
        let mut chan = TcpChannel::new("127.0.0.1:1");
        let mut buf = [0u8; 1];
        assert_eq!(
            chan.read(&mut buf).unwrap_err().kind(),
            ErrorKind::NotConnected
        );
        assert_eq!(chan.write(b"x").unwrap_err().kind(), ErrorKind::NotConnected);
        assert_eq!(chan.peer_addr().unwrap_err().kind(), ErrorKind::NotConnected);
    }
}
