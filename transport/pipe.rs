// Named pipe (FIFO) channel implementation
use crate::traits::{is_retry_kind, is_timeout_kind, poll_ready, Channel};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Result, Write};
use std::os::fd::AsFd;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use vio_core::{Direction, IoEvent};

pub struct PipeChannel {
    path: String,
    file: Option<File>,
    blocking: bool,
    last_error: Option<ErrorKind>,
}

impl PipeChannel {
    pub fn new(path: &str) -> Self {
        PipeChannel {
            path: path.to_string(),
            file: None,
            blocking: true,
            last_error: None,
        }
    }

    /// Adopt an already-opened pipe handle
    pub fn from_file(path: &str, file: File) -> Self {
        PipeChannel {
            path: path.to_string(),
            file: Some(file),
            blocking: true,
            last_error: None,
        }
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
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

    fn apply_blocking(file: &File, blocking: bool) -> Result<()> {
        let fd = file.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFL)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
        let mut flags = OFlag::from_bits_truncate(flags);
        flags.set(OFlag::O_NONBLOCK, !blocking);
        fcntl(fd, FcntlArg::F_SETFL(flags))
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
        Ok(())
    }
}

impl Channel for PipeChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let result = self.file()?.read(buf);
        self.track(result)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let result = self.file()?.write(data);
        self.track(result)
    }

    fn connect(&mut self, _timeout: Option<Duration>) -> Result<()> {
        // Read-write open so a lone endpoint does not block on the FIFO
        let open = OpenOptions::new().read(true).write(true).open(&self.path);
        let file = self.track(open)?;
        Self::apply_blocking(&file, self.blocking)?;
        self.file = Some(file);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }

    fn set_keepalive(&mut self, _enable: bool) -> Result<()> {
        Ok(())
    }

    fn fast_send(&mut self) -> Result<()> {
        Ok(())
    }

    fn io_wait(&mut self, event: IoEvent, timeout: Option<Duration>) -> Result<bool> {
        let file = self.file()?;
        poll_ready(file.as_fd(), event, timeout)
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    fn was_timeout(&self) -> bool {
        self.last_error.map_or(false, is_timeout_kind)
    }

    fn should_retry(&self) -> bool {
        self.last_error.map_or(false, is_retry_kind)
    }

    fn peer_addr(&self) -> Result<String> {
        Ok(self.path.clone())
    }

    fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.blocking = blocking;
        if let Some(ref file) = self.file {
            Self::apply_blocking(file, blocking)?;
        }
        Ok(())
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn set_timeout(&mut self, _direction: Direction, _timeout: Option<Duration>) -> Result<()> {
        // FIFOs have no per-operation timeout; callers use io_wait instead
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;

    #[test]
    fn fifo_carries_bytes_and_polls_ready() {
        let path = std::env::temp_dir().join(format!("vio-test-{}.fifo", std::process::id()));
        let _ = std::fs::remove_file(&path);
        mkfifo(&path, Mode::S_IRWXU).unwrap();

        let mut chan = PipeChannel::new(path.to_str().unwrap());
        assert!(!chan.is_connected());
        // Read-write open, so the single endpoint sees its own bytes back
        chan.connect(None).unwrap();
        assert!(chan.is_connected());
        assert_eq!(chan.peer_addr().unwrap(), path.to_str().unwrap());

        assert_eq!(chan.write(b"ping").unwrap(), 4);
        assert!(chan.io_wait(IoEvent::Read, Some(Duration::ZERO)).unwrap());

        let mut buf = [0u8; 4];
        assert_eq!(chan.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"ping");
        assert!(!chan.was_timeout());

        // Nonblocking empty read reports a retryable error
        chan.set_blocking(false).unwrap();
        let err = chan.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
        assert!(chan.should_retry());

        chan.shutdown().unwrap();
        assert!(!chan.is_connected());
        let _ = std::fs::remove_file(&path);
    }
}
