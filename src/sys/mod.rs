//! Platform layer.
//!
//! Each backend exposes a `Selector` with the same inherent methods:
//! `new`, `register`, `rearm`, `select` and `close`. The one matching the
//! target is re-exported here; no other module names a backend directly.

use std::fmt;
use std::io;

mod unix;

pub use self::unix::{pipe, set_cloexec, set_nonblock, Io};
pub(crate) use self::unix::Selector;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
)))]
compile_error!("net-poller supports epoll (Linux, Android) and kqueue (macOS, iOS, BSD) targets only");

/// The readiness facility compiled into this build.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Interest-list model: `epoll(7)`.
    Epoll,
    /// Event-queue model: `kqueue(2)`.
    Kqueue,
}

/// Backend selected for the current target.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const BACKEND: Backend = Backend::Epoll;

/// Backend selected for the current target.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const BACKEND: Backend = Backend::Kqueue;

impl Backend {
    /// Returns the name of the kernel facility.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Epoll => "epoll",
            Backend::Kqueue => "kqueue",
        }
    }

    /// Returns true if an edge-triggered registration fires again after a
    /// partial read, with no new data written.
    ///
    /// `epoll` only reports an edge when new data arrives, so a remainder
    /// left unread stays silent. `kqueue` evaluates the filter against the
    /// unread byte count, so the remainder is reported again.
    ///
    /// # Examples
    ///
    /// ```
    /// use net_poller::{Backend, BACKEND};
    ///
    /// match BACKEND {
    ///     Backend::Epoll => assert!(!BACKEND.edge_refires_on_partial_read()),
    ///     Backend::Kqueue => assert!(BACKEND.edge_refires_on_partial_read()),
    /// }
    /// ```
    pub fn edge_refires_on_partial_read(self) -> bool {
        match self {
            Backend::Epoll => false,
            Backend::Kqueue => true,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

pub(crate) trait IsMinusOne {
    fn is_minus_one(&self) -> bool;
}

impl IsMinusOne for i32 {
    fn is_minus_one(&self) -> bool {
        *self == -1
    }
}

impl IsMinusOne for isize {
    fn is_minus_one(&self) -> bool {
        *self == -1
    }
}

pub(crate) fn cvt<T: IsMinusOne>(t: T) -> io::Result<T> {
    if t.is_minus_one() {
        Err(io::Error::last_os_error())
    } else {
        Ok(t)
    }
}

#[test]
fn test_cvt() {
    assert_eq!(cvt(3i32).unwrap(), 3);
    assert!(cvt(-1isize).is_err());
}

#[test]
fn test_backend_name() {
    assert_eq!(Backend::Epoll.to_string(), "epoll");
    assert_eq!(Backend::Kqueue.to_string(), "kqueue");
}
