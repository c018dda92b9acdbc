// Unix domain socket channel implementation
use crate::traits::{is_retry_kind, is_timeout_kind, poll_ready, Channel};
use std::io::{ErrorKind, Read, Result, Write};
use std::net::Shutdown;
use std::os::fd::AsFd;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use nix::sys::socket::{setsockopt, sockopt};
use vio_core::{Direction, IoEvent};

pub struct UnixChannel {
    socket_path: String,
    stream: Option<UnixStream>,
    blocking: bool,
    last_error: Option<ErrorKind>,
}

impl UnixChannel {
    pub fn new(socket_path: &str) -> Self {
        UnixChannel {
            socket_path: socket_path.to_string(),
            stream: None,
            blocking: true,
            last_error: None,
        }
    }

    /// Adopt an already-accepted stream (server side)
    pub fn from_stream(stream: UnixStream) -> Self {
        UnixChannel {
            socket_path: String::new(),
            stream: Some(stream),
            blocking: true,
            last_error: None,
        }
    }

    /// Set socket send buffer size (SO_SNDBUF)
    pub fn set_send_buffer_size(&self, size: usize) -> Result<()> {
        if let Some(ref stream) = self.stream {
            setsockopt(stream, sockopt::SndBuf, &size)
                .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
        }
        Ok(())
    }

    fn stream(&mut self) -> Result<&mut UnixStream> {
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

impl Channel for UnixChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let result = self.stream()?.read(buf);
        self.track(result)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let result = self.stream()?.write(data);
        self.track(result)
    }

    fn connect(&mut self, _timeout: Option<Duration>) -> Result<()> {
        let stream = self.track(UnixStream::connect(&self.socket_path))?;
        stream.set_nonblocking(!self.blocking)?;
        self.stream = Some(stream);

        // Larger send buffer for high-throughput writers
        let _ = self.set_send_buffer_size(65536);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(ref stream) = self.stream {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.stream = None;
        Ok(())
    }

    fn set_keepalive(&mut self, _enable: bool) -> Result<()> {
        // No keepalive probing on AF_UNIX
        Ok(())
    }

    fn fast_send(&mut self) -> Result<()> {
        // No Nagle batching on AF_UNIX
        Ok(())
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
        if self.stream.is_none() {
            return Err(std::io::Error::new(
                ErrorKind::NotConnected,
                "Not connected",
            ));
        }
        if self.socket_path.is_empty() {
            Ok("socket".to_string())
        } else {
            Ok(self.socket_path.clone())
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
