// Plugin channel: an externally supplied backend adopted behind the same
// capability set. The provider implements Channel; the handle only fixes
// the variant tag.
use crate::traits::Channel;
use std::io::Result;
use std::time::Duration;

use vio_core::{Direction, IoEvent};

pub struct PluginChannel {
    inner: Box<dyn Channel>,
}

impl PluginChannel {
    pub fn new(inner: Box<dyn Channel>) -> Self {
        PluginChannel { inner }
    }
}

impl Channel for PluginChannel {
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

// In-memory scripted channel used by tests across the crate
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    pub(crate) struct ScriptedChannel {
        chunks: VecDeque<Vec<u8>>,
        pub(crate) written: Vec<u8>,
        pub(crate) raw_reads: usize,
    }

    impl ScriptedChannel {
        pub(crate) fn new(chunks: &[&[u8]]) -> Self {
            ScriptedChannel {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                written: Vec::new(),
                raw_reads: 0,
            }
        }
    }

    impl Channel for ScriptedChannel {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.raw_reads += 1;
            let mut chunk = match self.chunks.pop_front() {
                Some(c) => c,
                None => return Ok(0),
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            Ok(n)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize> {
            self.written.extend_from_slice(data);
            Ok(data.len())
        }

        fn connect(&mut self, _timeout: Option<Duration>) -> Result<()> {
            Ok(())
        }

        fn shutdown(&mut self) -> Result<()> {
            self.chunks.clear();
            Ok(())
        }

        fn set_keepalive(&mut self, _enable: bool) -> Result<()> {
            Ok(())
        }

        fn fast_send(&mut self) -> Result<()> {
            Ok(())
        }

        fn io_wait(&mut self, _event: IoEvent, _timeout: Option<Duration>) -> Result<bool> {
            Ok(true)
        }

        fn is_connected(&self) -> bool {
            !self.chunks.is_empty()
        }

        fn was_timeout(&self) -> bool {
            false
        }

        fn should_retry(&self) -> bool {
            !self.chunks.is_empty()
        }

        fn peer_addr(&self) -> Result<String> {
            Ok("scripted".to_string())
        }

        fn set_blocking(&mut self, _blocking: bool) -> Result<()> {
            Ok(())
        }

        fn is_blocking(&self) -> bool {
            true
        }

        fn set_timeout(&mut self, _direction: Direction, _timeout: Option<Duration>) -> Result<()> {
            Ok(())
        }
    }
}
