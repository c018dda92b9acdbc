// harness: startup-mode selection and the one-shot fuzz driver.
//
// The fuzz mode trades every production safety for reproducibility: no
// signal handlers, no worker threads, no accept loop. It must never be
// enabled in a deployed configuration.
use std::env;
use std::io::Result;
use std::time::Duration;

use once_cell::sync::Lazy;
use vio_core::{ConnectProtocol, VioVariant};
use vio_transport::{
    FuzzSource, PipeChannel, TcpChannel, UnixChannel, VioHandle, VioParams,
};

const DEFAULT_TCP_ADDR: &str = "127.0.0.1:3490";
const DEFAULT_SOCKET_PATH: &str = "/tmp/vio";

// Environment variables for configuration
// VIO_HARNESS_MODE: "threaded" (default) or "fuzz"
// VIO_TCP_ADDR:     TCP listen/dial address
// VIO_SOCKET_PATH:  Unix socket path

/// Run mode selected once at startup. The fuzz switch is a runtime value,
/// not a build flavor, so the one-shot behavior is testable in any build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessMode {
    /// Production shape: signal handling, thread-per-connection, accept loop
    Threaded,
    /// Fuzzing shape: single-threaded, signal-free, one connection cycle
    /// driven directly by the fuzz entry point
    SyncOneShot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMode {
    ThreadPerConnection,
    Synchronous,
}

pub struct HarnessConfig {
    pub mode: HarnessMode,
    pub tcp_addr: String,
    pub socket_path: String,
}

impl HarnessConfig {
    pub fn from_env() -> Self {
        let mode = match env::var("VIO_HARNESS_MODE").as_deref() {
            Ok("fuzz") => HarnessMode::SyncOneShot,
            _ => HarnessMode::Threaded,
        };
        let tcp_addr = env::var("VIO_TCP_ADDR").unwrap_or_else(|_| DEFAULT_TCP_ADDR.to_string());
        let socket_path =
            env::var("VIO_SOCKET_PATH").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string());
        HarnessConfig {
            mode,
            tcp_addr,
            socket_path,
        }
    }
}

// Read once at startup and cached for the process lifetime
static CONFIG: Lazy<HarnessConfig> = Lazy::new(HarnessConfig::from_env);

pub fn config() -> &'static HarnessConfig {
    &CONFIG
}

// One fuzz input per invocation: the connect-time Fuzz protocol and the
// daemon's one-shot cycle share this source. Tests that need isolation
// construct their own FuzzSource instances instead.
static FUZZ_SOURCE: Lazy<FuzzSource> = Lazy::new(FuzzSource::new);

pub fn process_fuzz_source() -> &'static FuzzSource {
    &FUZZ_SOURCE
}

/// Startup decisions derived from the run mode; the daemon consumes this
/// instead of branching on the mode itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerInit {
    pub install_signal_handlers: bool,
    pub scheduling: SchedulingMode,
    pub enter_accept_loop: bool,
}

pub fn server_init(mode: HarnessMode) -> ServerInit {
    match mode {
        HarnessMode::Threaded => ServerInit {
            install_signal_handlers: true,
            scheduling: SchedulingMode::ThreadPerConnection,
            enter_accept_loop: true,
        },
        HarnessMode::SyncOneShot => ServerInit {
            install_signal_handlers: false,
            scheduling: SchedulingMode::Synchronous,
            enter_accept_loop: false,
        },
    }
}

/// Map the client-facing protocol selection to a transport variant
pub fn select_variant(protocol: ConnectProtocol) -> VioVariant {
    match protocol {
        ConnectProtocol::Default | ConnectProtocol::Tcp => VioVariant::TcpIp,
        ConnectProtocol::Socket => VioVariant::UnixSocket,
        ConnectProtocol::Pipe => VioVariant::NamedPipe,
        ConnectProtocol::Memory => VioVariant::SharedMemory,
        ConnectProtocol::Fuzz => VioVariant::Fuzz,
    }
}

/// Dial a client handle for the selected protocol. Memory has no dialable
/// endpoint (pairs are created in-process) and is rejected here.
pub fn connect_client(
    protocol: ConnectProtocol,
    target: &str,
    timeout: Option<Duration>,
) -> Result<VioHandle> {
    let mut handle = match select_variant(protocol) {
        VioVariant::TcpIp => VioHandle::new(VioParams::TcpIp(TcpChannel::new(target))),
        VioVariant::UnixSocket => VioHandle::new(VioParams::UnixSocket(UnixChannel::new(target))),
        VioVariant::NamedPipe => VioHandle::new(VioParams::NamedPipe(PipeChannel::new(target))),
        VioVariant::Fuzz => {
            // A fuzz client reads whatever the process fuzz source holds
            let handle = VioHandle::new(VioParams::Fuzz(process_fuzz_source().clone()));
            return Ok(handle);
        }
        other => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("cannot dial a {} endpoint", other),
            ));
        }
    };
    handle.connect(timeout)?;
    Ok(handle)
}

/// One fuzz invocation: owns the fuzz source, seeds it from the supplied
/// input, builds exactly one Fuzz-variant handle and drives the protocol
/// handler synchronously on the calling thread.
pub struct FuzzHarness {
    source: FuzzSource,
}

impl FuzzHarness {
    pub fn new() -> Self {
        FuzzHarness {
            source: FuzzSource::new(),
        }
    }

    pub fn source(&self) -> &FuzzSource {
        &self.source
    }

    pub fn run<F>(&self, input: &[u8], handler: F) -> Result<()>
    where
        F: FnOnce(&mut VioHandle) -> Result<()>,
    {
        // Seeding happens-before the handle sees the buffer
        self.source.seed(input);
        let mut handle = VioHandle::new(VioParams::Fuzz(self.source.clone()));
        handler(&mut handle)
    }
}

impl Default for FuzzHarness {
    fn default() -> Self {
        FuzzHarness::new()
    }
}
