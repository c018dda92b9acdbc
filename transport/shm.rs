// Shared memory channel implementation: an in-process duplex pair built on
// bounded chunk queues. Peers exchange byte chunks; a pending-chunk carry
// keeps read semantics byte-exact across chunk boundaries.
use crate::traits::{is_retry_kind, is_timeout_kind, Channel};
use std::io::{ErrorKind, Result};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use vio_core::{Direction, IoEvent};

pub struct ShmChannel {
    tx: Option<Sender<Vec<u8>>>,
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pending_pos: usize,
    blocking: bool,
    read_timeout: Option<Duration>,
    peer_gone: bool,
    last_error: Option<ErrorKind>,
}

/// Create both ends of a shared memory channel. `capacity` is the queue
/// depth in chunks for each direction.
pub fn shm_pair(capacity: usize) -> (ShmChannel, ShmChannel) {
    let (a_tx, b_rx) = bounded(capacity);
    let (b_tx, a_rx) = bounded(capacity);
    (ShmChannel::from_parts(a_tx, a_rx), ShmChannel::from_parts(b_tx, b_rx))
}

impl ShmChannel {
    fn from_parts(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        ShmChannel {
            tx: Some(tx),
            rx,
            pending: Vec::new(),
            pending_pos: 0,
            blocking: true,
            read_timeout: None,
            peer_gone: false,
            last_error: None,
        }
    }

    fn pending_len(&self) -> usize {
        self.pending.len() - self.pending_pos
    }

    fn serve_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending_len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
        self.pending_pos += n;
        if self.pending_pos == self.pending.len() {
            self.pending.clear();
            self.pending_pos = 0;
        }
        n
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.kind()),
        }
        result
    }

    // Pull the next chunk into the pending carry. Ok(false) means the peer
    // dropped its sender (end of stream).
    fn refill(&mut self) -> Result<bool> {
        let chunk = if !self.blocking {
            match self.rx.try_recv() {
                Ok(c) => c,
                Err(TryRecvError::Empty) => {
                    return Err(std::io::Error::new(ErrorKind::WouldBlock, "No data"));
                }
                Err(TryRecvError::Disconnected) => {
                    self.peer_gone = true;
                    return Ok(false);
                }
            }
        } else if let Some(timeout) = self.read_timeout {
            match self.rx.recv_timeout(timeout) {
                Ok(c) => c,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(std::io::Error::new(ErrorKind::TimedOut, "Read timed out"));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.peer_gone = true;
                    return Ok(false);
                }
            }
        } else {
            match self.rx.recv() {
                Ok(c) => c,
                Err(_) => {
                    self.peer_gone = true;
                    return Ok(false);
                }
            }
        };
        self.pending = chunk;
        self.pending_pos = 0;
        Ok(true)
    }
}

impl Channel for ShmChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending_len() == 0 {
            let refill = self.refill();
            match self.track(refill) {
                Ok(true) => {}
                Ok(false) => return Ok(0), // Peer closed
                Err(e) => return Err(e),
            }
        }
        Ok(self.serve_pending(buf))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let tx = match self.tx {
            Some(ref tx) => tx,
            None => {
                let err = Err(std::io::Error::new(ErrorKind::BrokenPipe, "Shut down"));
                return self.track(err);
            }
        };
        let sent = if self.blocking {
            tx.send(data.to_vec())
                .map_err(|_| std::io::Error::new(ErrorKind::BrokenPipe, "Peer closed"))
        } else {
            match tx.try_send(data.to_vec()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    Err(std::io::Error::new(ErrorKind::WouldBlock, "Queue full"))
                }
                Err(TrySendError::Disconnected(_)) => {
                    Err(std::io::Error::new(ErrorKind::BrokenPipe, "Peer closed"))
                }
            }
        };
        let sent = sent.map(|()| data.len());
        self.track(sent)
    }

    fn connect(&mut self, _timeout: Option<Duration>) -> Result<()> {
        // The pair is wired at construction
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        // Dropping the sender lets the peer observe end of stream
        self.tx = None;
        Ok(())
    }

    fn set_keepalive(&mut self, _enable: bool) -> Result<()> {
        Ok(())
    }

    fn fast_send(&mut self) -> Result<()> {
        Ok(())
    }

    fn io_wait(&mut self, event: IoEvent, timeout: Option<Duration>) -> Result<bool> {
        match event {
            IoEvent::Read => {
                if self.pending_len() > 0 || !self.rx.is_empty() || self.peer_gone {
                    return Ok(true);
                }
                let chunk = match timeout {
                    Some(d) => match self.rx.recv_timeout(d) {
                        Ok(c) => c,
                        Err(RecvTimeoutError::Timeout) => return Ok(false),
                        Err(RecvTimeoutError::Disconnected) => {
                            self.peer_gone = true;
                            return Ok(true); // Readable: read will report 0
                        }
                    },
                    None => match self.rx.recv() {
                        Ok(c) => c,
                        Err(_) => {
                            self.peer_gone = true;
                            return Ok(true);
                        }
                    },
                };
                self.pending = chunk;
                self.pending_pos = 0;
                Ok(true)
            }
            IoEvent::Write => Ok(self.tx.as_ref().map_or(false, |tx| !tx.is_full())),
        }
    }

    fn is_connected(&self) -> bool {
        self.tx.is_some() && !self.peer_gone
    }

    fn was_timeout(&self) -> bool {
        self.last_error.map_or(false, is_timeout_kind)
    }

    fn should_retry(&self) -> bool {
        self.last_error.map_or(false, is_retry_kind)
    }

    fn peer_addr(&self) -> Result<String> {
        Ok("shared memory".to_string())
    }

    fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.blocking = blocking;
        Ok(())
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn set_timeout(&mut self, direction: Direction, timeout: Option<Duration>) -> Result<()> {
        if direction == Direction::Read {
            self.read_timeout = timeout;
        }
        // Writes block on queue depth only; no write timeout
        Ok(())
    }
}
