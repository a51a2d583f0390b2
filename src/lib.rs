//! # Read-readiness notification
//!
//! A small, blocking abstraction over the kernel readiness facilities:
//! `epoll` on Linux and Android, `kqueue` on macOS and the BSDs. Exactly one
//! backend is compiled in, chosen by the target operating system.
//!
//! The whole surface is four operations on a [`Poller`]: create it, register
//! a descriptor for read-readiness under a [`Mode`], wait for a single ready
//! descriptor, and re-arm a one-shot registration.
//!
//! # Modes
//!
//! * [`Mode::Edge`] fires once per transition into "unread data present".
//! * [`Mode::Level`] fires on every wait while unread data remains.
//! * [`Mode::OneShot`] fires once and then stays silent until
//!   [`Poller::rearm_read`] is called.
//!
//! Edge mode differs between backends after a partial read: `epoll` stays
//! silent until new data arrives, `kqueue` fires again because unread bytes
//! remain. See [`Backend::edge_refires_on_partial_read`].
//!
//! # Examples
//!
//! ```
//! use std::io::Write;
//! use std::os::unix::io::AsRawFd;
//! use std::time::Duration;
//!
//! use net_poller::{pipe, Mode, Poller};
//!
//! # fn main() -> std::io::Result<()> {
//! let (rx, mut tx) = pipe()?;
//! let mut poller = Poller::new()?;
//! poller.register_read(rx.as_raw_fd(), Mode::Level)?;
//!
//! tx.write_all(b"abcdefgh")?;
//!
//! let event = poller.wait(Some(Duration::from_millis(50)))?.expect("readable");
//! assert_eq!(event.fd(), rx.as_raw_fd());
//! assert_eq!(event.available(), 8);
//! # Ok(())
//! # }
//! ```

#![warn(
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations,
    missing_docs
)]

pub mod event;

mod poll;
mod sys;

#[doc(inline)]
pub use crate::event::{Event, Filter, Mode, ParseModeError};
#[doc(inline)]
pub use crate::poll::Poller;
#[doc(inline)]
pub use crate::sys::{pipe, set_cloexec, set_nonblock, Backend, Io, BACKEND};
