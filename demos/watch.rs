//! Watches stdin for read-readiness and drains it.
//!
//! ```text
//! $ RUST_LOG=net_poller=trace cargo run --example watch -- oneshot
//! ```
//!
//! The first argument picks the mode (`edge`, `level` or `oneshot`,
//! default `level`). The second, if given, caps how many bytes are read per
//! event, which makes the edge-triggered divergence between backends
//! visible.

use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::mem::ManuallyDrop;
use std::os::unix::io::FromRawFd;
use std::time::Duration;

use anyhow::Context;
use log::info;
use net_poller::{set_nonblock, Mode, Poller};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mode: Mode = match args.next() {
        Some(arg) => arg.parse()?,
        None => Mode::Level,
    };
    let chunk: usize = match args.next() {
        Some(arg) => arg.parse().context("chunk size must be a number")?,
        None => 4096,
    };

    // Read the descriptor directly: `io::Stdin` buffers ahead of the kernel.
    let fd = libc::STDIN_FILENO;
    let mut stdin = ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    set_nonblock(fd).context("stdin cannot be made non-blocking")?;

    let mut poller = Poller::new().context("creating poller")?;
    poller.register_read(fd, mode)?;
    info!("watching stdin on {} in {} mode", poller.backend(), mode);

    let mut buf = vec![0; chunk];
    loop {
        let event = match poller.wait(Some(Duration::from_secs(5)))? {
            Some(event) => event,
            None => {
                println!("idle");
                continue;
            }
        };

        println!("ready: {} bytes available", event.available());

        match stdin.read(&mut buf) {
            Ok(0) => {
                println!("end of input");
                break;
            }
            Ok(n) => println!("read {} bytes", n),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }

        if mode.is_oneshot() {
            poller.rearm_read(fd)?;
        }
    }

    poller.close()?;
    Ok(())
}
