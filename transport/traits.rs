// Channel abstraction - the fixed operation set every backend implements.
// A handle binds exactly one implementation at construction; call sites
// never branch on the backend again.
use std::io::{ErrorKind, Result};
use std::time::Duration;

use vio_core::{Direction, IoEvent};

pub trait Channel: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn write(&mut self, data: &[u8]) -> Result<usize>;
    fn connect(&mut self, timeout: Option<Duration>) -> Result<()>;
    fn shutdown(&mut self) -> Result<()>;

    /// Enable or disable keepalive probing; success no-op where the
    /// backend has no such notion.
    fn set_keepalive(&mut self, enable: bool) -> Result<()>;

    /// Ask the backend to favor latency over batching (TCP_NODELAY on
    /// TCP-backed variants); success no-op elsewhere.
    fn fast_send(&mut self) -> Result<()>;

    /// Wait until the channel is ready for the given event, or the timeout
    /// elapses. Returns true when ready, false on timeout. A timeout of
    /// None waits indefinitely.
    fn io_wait(&mut self, event: IoEvent, timeout: Option<Duration>) -> Result<bool>;

    fn is_connected(&self) -> bool;

    /// Whether the most recent failed operation was a timeout
    fn was_timeout(&self) -> bool;

    /// Whether retrying the most recent operation may make progress
    fn should_retry(&self) -> bool;

    fn peer_addr(&self) -> Result<String>;

    fn set_blocking(&mut self, blocking: bool) -> Result<()>;
    fn is_blocking(&self) -> bool;

    fn set_timeout(&mut self, direction: Direction, timeout: Option<Duration>) -> Result<()>;
}

// Shared error-kind predicates for the socket-backed channels
pub(crate) fn is_timeout_kind(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

pub(crate) fn is_retry_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::Interrupted | ErrorKind::TimedOut
    )
}

/// Single-descriptor readiness wait shared by the fd-backed channels.
/// Returns true when the descriptor is ready, false when the timeout elapsed.
pub(crate) fn poll_ready(
    fd: std::os::fd::BorrowedFd<'_>,
    event: IoEvent,
    timeout: Option<Duration>,
) -> Result<bool> {
    use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

    let flags = match event {
        IoEvent::Read => PollFlags::POLLIN,
        IoEvent::Write => PollFlags::POLLOUT,
    };
    let timeout = match timeout {
        Some(d) => {
            let ms = d.as_millis().min(i32::MAX as u128) as i32;
            PollTimeout::try_from(ms).unwrap_or(PollTimeout::MAX)
        }
        // No timeout: wait until ready
        None => PollTimeout::NONE,
    };

    let mut fds = [PollFd::new(fd, flags)];
    let ready = poll(&mut fds, timeout)
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
    Ok(ready > 0)
}
