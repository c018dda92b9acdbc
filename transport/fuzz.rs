// Deterministic fuzz channel: reads come from a fixed byte buffer behind a
// cursor, writes are discarded, and every control operation succeeds
// immediately. Protocol code above it sees a peer that sends exactly the
// seeded bytes and then silently disappears.
use crate::traits::Channel;
use std::io::Result;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use vio_core::{Direction, IoEvent};

struct FuzzState {
    data: Vec<u8>,
    cursor: usize,
}

/// Buffer-plus-cursor state backing the Fuzz variant. The harness owns and
/// seeds it once per invocation; handles share the live state, so re-seeding
/// re-arms every handle still bound to this source. One active reader at a
/// time; the lock is for soundness, not a concurrency feature.
#[derive(Clone)]
pub struct FuzzSource {
    inner: Arc<Mutex<FuzzState>>,
}

impl FuzzSource {
    pub fn new() -> Self {
        FuzzSource {
            inner: Arc::new(Mutex::new(FuzzState {
                data: Vec::new(),
                cursor: 0,
            })),
        }
    }

    // Nothing panics while holding the lock, so poisoning is unreachable;
    // recover the guard rather than propagate a poison error.
    fn state(&self) -> MutexGuard<'_, FuzzState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-arm the source: rebind the buffer and reset the cursor to 0.
    /// Must happen-before any read against the new buffer.
    pub fn seed(&self, data: &[u8]) {
        let mut state = self.state();
        state.data = data.to_vec();
        state.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.state().cursor
    }

    pub fn remaining(&self) -> usize {
        let state = self.state();
        state.data.len() - state.cursor
    }

    // Copy min(buf.len(), remaining) bytes at the cursor and advance it by
    // exactly that count. 0 at exhaustion, destination untouched.
    fn read_into(&self, buf: &mut [u8]) -> usize {
        let mut state = self.state();
        let remaining = state.data.len() - state.cursor;
        let n = remaining.min(buf.len());
        if n > 0 {
            buf[..n].copy_from_slice(&state.data[state.cursor..state.cursor + n]);
            state.cursor += n;
        }
        n
    }
}

impl Default for FuzzSource {
    fn default() -> Self {
        FuzzSource::new()
    }
}

pub struct FuzzChannel {
    source: FuzzSource,
}

impl FuzzChannel {
    pub fn new(source: FuzzSource) -> Self {
        FuzzChannel { source }
    }
}

impl Channel for FuzzChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.source.read_into(buf))
    }

    // Bytes are accepted in full and discarded; the cursor is untouched
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(data.len())
    }

    // No address resolution, no handshake, timeout ignored
    fn connect(&mut self, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_keepalive(&mut self, _enable: bool) -> Result<()> {
        Ok(())
    }

    fn fast_send(&mut self) -> Result<()> {
        Ok(())
    }

    // Never waits: readiness is immediate even at exhaustion, so pollers
    // proceed to the read that reports end-of-input
    fn io_wait(&mut self, _event: IoEvent, _timeout: Option<Duration>) -> Result<bool> {
        Ok(true)
    }

    // Connected exactly while unread bytes remain; exhaustion reads as the
    // peer having gone away without a shutdown
    fn is_connected(&self) -> bool {
        self.source.remaining() > 0
    }

    fn was_timeout(&self) -> bool {
        false
    }

    fn should_retry(&self) -> bool {
        self.source.remaining() > 0
    }

    fn peer_addr(&self) -> Result<String> {
        Ok("Fuzz".to_string())
    }

    fn set_blocking(&mut self, _blocking: bool) -> Result<()> {
        Ok(())
    }

    fn is_blocking(&self) -> bool {
        false
    }

    fn set_timeout(&mut self, _direction: Direction, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }
}
