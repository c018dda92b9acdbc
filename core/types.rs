// Core types shared by the transport layer, harness and daemon
use std::fmt;

// One backend kind per open channel. Closed set: constructing a handle
// performs one exhaustive match over this enum, so an unknown variant is
// unrepresentable rather than a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VioVariant {
    TcpIp,
    UnixSocket,
    NamedPipe,
    SharedMemory,
    Tls,
    Plugin,
    Fuzz,
}

impl VioVariant {
    /// Human-readable label used in diagnostics and peer_addr fallbacks
    pub fn label(&self) -> &'static str {
        match self {
            VioVariant::TcpIp => "TCP/IP",
            VioVariant::UnixSocket => "socket",
            VioVariant::NamedPipe => "named pipe",
            VioVariant::SharedMemory => "shared memory",
            VioVariant::Tls => "SSL/TLS",
            VioVariant::Plugin => "plugin",
            VioVariant::Fuzz => "Fuzz",
        }
    }

    /// True for variants whose raw reads are syscalls worth amortizing with
    /// the read-ahead buffer. Fuzz is already an in-memory buffer and the
    /// non-stream variants manage their own chunking.
    pub fn is_socket_like(&self) -> bool {
        matches!(
            self,
            VioVariant::TcpIp | VioVariant::UnixSocket | VioVariant::Tls
        )
    }
}

impl fmt::Display for VioVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// Client-facing protocol selection, resolved to a VioVariant at connect time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectProtocol {
    Default,
    Tcp,
    Socket,
    Pipe,
    Memory,
    Fuzz,
}

// Timeout direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

// Readiness event for io_wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEvent {
    Read,
    Write,
}
