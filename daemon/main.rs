// daemon: connection server over the virtual I/O layer.
//
// Threaded mode: ignore SIGPIPE, listen on Unix and TCP endpoints, serve
// each accepted connection on its own thread. Fuzz mode: no signals, no
// listeners, no threads - read one input from stdin and drive a single
// connection cycle through the fuzz harness.
use std::io::Read;
use std::net::TcpListener;
use std::os::unix::net::UnixListener;
use std::thread;

use nix::sys::signal::{signal, SigHandler, Signal};
use vio_harness::{server_init, FuzzHarness};
use vio_transport::{TcpChannel, UnixChannel, VioHandle, VioParams, DEFAULT_READ_BUFFER_SIZE};

fn main() {
    let config = vio_harness::config();
    let init = server_init(config.mode);

    if init.install_signal_handlers {
        // A client vanishing mid-write must not kill the daemon
        unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) }
            .expect("failed to ignore SIGPIPE");
    }

    if !init.enter_accept_loop {
        run_fuzz_cycle();
        return;
    }

    // Remove old socket if exists
    let _ = std::fs::remove_file(&config.socket_path);

    let unix_path = config.socket_path.clone();
    thread::spawn(move || {
        let listener = UnixListener::bind(&unix_path).unwrap();
        println!("vio daemon listening on {}", unix_path);

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(_) => continue,
            };
            thread::spawn(move || {
                let mut handle = VioHandle::new(VioParams::UnixSocket(
                    UnixChannel::from_stream(stream),
                ))
                .with_read_buffer(DEFAULT_READ_BUFFER_SIZE);
                if let Err(e) = serve_connection(&mut handle) {
                    eprintln!("unix connection error: {}", e);
                }
            });
        }
    });

    let listener = TcpListener::bind(&config.tcp_addr).unwrap();
    println!("vio daemon serving on {}", config.tcp_addr);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(_) => continue,
        };
        thread::spawn(move || {
            let mut handle =
                VioHandle::new(VioParams::TcpIp(TcpChannel::from_stream(stream)))
                    .with_read_buffer(DEFAULT_READ_BUFFER_SIZE);
            let _ = handle.set_keepalive(true);
            let _ = handle.fast_send();
            if let Err(e) = serve_connection(&mut handle) {
                eprintln!("tcp connection error: {}", e);
            }
        });
    }
}

// One-shot cycle for a fuzzer-supplied input: seed, serve, exit
fn run_fuzz_cycle() {
    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .expect("failed to read fuzz input");

    let harness = FuzzHarness::new();
    match harness.run(&input, serve_connection) {
        Ok(()) => println!("fuzz cycle complete"),
        Err(e) => eprintln!("fuzz cycle error: {}", e),
    }
}

// The protocol-processing loop. It only sees the uniform handle surface,
// so the same code runs against live sockets and the fuzz transport.
fn serve_connection(handle: &mut VioHandle) -> std::io::Result<()> {
    let peer = handle.peer_addr().unwrap_or_else(|_| handle.label().to_string());
    let mut buf = [0u8; 4096];
    let mut total = 0usize;

    loop {
        match handle.read(&mut buf) {
            Ok(0) => {
                if !handle.should_retry() {
                    break; // Peer closed
                }
            }
            Ok(n) => {
                total += n;
                handle.write(&buf[..n])?;
            }
            Err(e) => {
                if handle.should_retry() {
                    continue;
                }
                eprintln!("read error from {}: {}", peer, e);
                break;
            }
        }
    }

    println!("{} [{}]: {} bytes echoed", peer, handle.label(), total);
    handle.shutdown()
}
