// Transport handle: one open channel behind the uniform operation set.
// Construction performs the single exhaustive match over the variant set;
// after that, call sites never branch on the backend again.
use crate::buffered::ReadBuffer;
use crate::fuzz::{FuzzChannel, FuzzSource};
use crate::pipe::PipeChannel;
use crate::plugin::PluginChannel;
use crate::shm::ShmChannel;
use crate::tcp::TcpChannel;
use crate::tls::TlsChannel;
use crate::traits::Channel;
use crate::unix::UnixChannel;
use std::io::Result;
use std::time::Duration;

use vio_core::{Direction, IoEvent, VioVariant};

/// Variant-specific construction parameters, exactly one payload shape per
/// variant. How the underlying endpoint was created (bind, listen, dial,
/// handshake) belongs to the caller.
pub enum VioParams {
    TcpIp(TcpChannel),
    UnixSocket(UnixChannel),
    NamedPipe(PipeChannel),
    SharedMemory(ShmChannel),
    Tls(TlsChannel),
    Plugin(Box<dyn Channel>),
    Fuzz(FuzzSource),
}

pub struct VioHandle {
    variant: VioVariant,
    channel: Box<dyn Channel>,
    read_buffer: Option<ReadBuffer>,
}

impl std::fmt::Debug for VioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VioHandle")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

impl VioHandle {
    /// Bind the operation set for the requested variant. The match is
    /// exhaustive and every arm pairs the tag with its own implementation,
    /// so a handle can never expose a mismatched operation set.
    pub fn new(params: VioParams) -> Self {
        let (variant, channel): (VioVariant, Box<dyn Channel>) = match params {
            VioParams::TcpIp(c) => (VioVariant::TcpIp, Box::new(c)),
            VioParams::UnixSocket(c) => (VioVariant::UnixSocket, Box::new(c)),
            VioParams::NamedPipe(c) => (VioVariant::NamedPipe, Box::new(c)),
            VioParams::SharedMemory(c) => (VioVariant::SharedMemory, Box::new(c)),
            VioParams::Tls(c) => (VioVariant::Tls, Box::new(c)),
            VioParams::Plugin(c) => (VioVariant::Plugin, Box::new(PluginChannel::new(c))),
            VioParams::Fuzz(s) => (VioVariant::Fuzz, Box::new(FuzzChannel::new(s))),
        };
        VioHandle {
            variant,
            channel,
            read_buffer: None,
        }
    }

    /// Attach the read-ahead buffer. Bypassed for variants that are not
    /// socket-like: the fuzz source already is an in-memory buffer and the
    /// non-stream backends chunk their own reads.
    pub fn with_read_buffer(mut self, capacity: usize) -> Self {
        if self.variant.is_socket_like() {
            self.read_buffer = Some(ReadBuffer::new(capacity));
        }
        self
    }

    pub fn variant(&self) -> VioVariant {
        self.variant
    }

    pub fn label(&self) -> &'static str {
        self.variant.label()
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.read_buffer {
            Some(ref mut rb) => rb.read(self.channel.as_mut(), buf),
            None => self.channel.read(buf),
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.channel.write(data)
    }

    pub fn connect(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.channel.connect(timeout)
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.channel.shutdown()
    }

    pub fn set_keepalive(&mut self, enable: bool) -> Result<()> {
        self.channel.set_keepalive(enable)
    }

    pub fn fast_send(&mut self) -> Result<()> {
        self.channel.fast_send()
    }

    pub fn io_wait(&mut self, event: IoEvent, timeout: Option<Duration>) -> Result<bool> {
        // Buffered bytes are immediately readable
        if event == IoEvent::Read {
            if let Some(ref rb) = self.read_buffer {
                if rb.buffered() > 0 {
                    return Ok(true);
                }
            }
        }
        self.channel.io_wait(event, timeout)
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn was_timeout(&self) -> bool {
        self.channel.was_timeout()
    }

    pub fn should_retry(&self) -> bool {
        self.channel.should_retry()
    }

    pub fn peer_addr(&self) -> Result<String> {
        self.channel.peer_addr()
    }

    pub fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.channel.set_blocking(blocking)
    }

    pub fn is_blocking(&self) -> bool {
        self.channel.is_blocking()
    }

    pub fn set_timeout(&mut self, direction: Direction, timeout: Option<Duration>) -> Result<()> {
        self.channel.set_timeout(direction, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::testing::ScriptedChannel;
    use crate::shm::shm_pair;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    #[test]
    fn fuzz_handle_reports_its_variant_and_bypasses_buffering() {
        let source = FuzzSource::new();
        source.seed(&[1, 2, 3]);
        let handle = VioHandle::new(VioParams::Fuzz(source)).with_read_buffer(4096);
        assert_eq!(handle.variant(), VioVariant::Fuzz);
        assert_eq!(handle.label(), "Fuzz");
        assert!(handle.read_buffer.is_none());
        assert_eq!(handle.peer_addr().unwrap(), "Fuzz");
    }

    #[test]
    fn plugin_handle_dispatches_to_supplied_channel() {
        let scripted = ScriptedChannel::new(&[b"payload"]);
        let mut handle =
            VioHandle::new(VioParams::Plugin(Box::new(scripted))).with_read_buffer(4096);
        assert_eq!(handle.variant(), VioVariant::Plugin);
        assert!(handle.read_buffer.is_none());

        let mut buf = [0u8; 16];
        assert_eq!(handle.read(&mut buf).unwrap(), 7);
        assert_eq!(&buf[..7], b"payload");
        assert_eq!(handle.write(b"ack").unwrap(), 3);
    }

    #[test]
    fn fuzz_exhaustion_leaves_other_handles_untouched() {
        let source = FuzzSource::new();
        source.seed(&[0xFF; 8]);
        let mut fuzz = VioHandle::new(VioParams::Fuzz(source));

        let (shm_a, mut shm_b) = shm_pair(4);
        let mut shm = VioHandle::new(VioParams::SharedMemory(shm_a));

        // Drain the fuzz handle completely
        let mut buf = [0u8; 64];
        while fuzz.read(&mut buf).unwrap() > 0 {}
        assert!(!fuzz.is_connected());

        // The shared memory handle still works both ways
        assert!(shm.is_connected());
        assert_eq!(shm.write(b"still up").unwrap(), 8);
        let mut out = [0u8; 8];
        assert_eq!(shm_b.read(&mut out).unwrap(), 8);
        assert_eq!(&out, b"still up");
    }

    #[test]
    fn buffered_tcp_handle_preserves_byte_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"0123456789").unwrap();
            let mut ack = [0u8; 2];
            stream.read_exact(&mut ack).unwrap();
            ack
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut handle =
            VioHandle::new(VioParams::TcpIp(TcpChannel::from_stream(stream))).with_read_buffer(64);
        assert!(handle.read_buffer.is_some());

        let mut collected = Vec::new();
        let mut buf = [0u8; 3];
        while collected.len() < 10 {
            let n = handle.read(&mut buf).unwrap();
            assert!(n > 0);
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"0123456789");

        handle.write(b"ok").unwrap();
        assert_eq!(&server.join().unwrap(), b"ok");
        handle.shutdown().unwrap();
        assert!(!handle.is_connected());
    }
}
