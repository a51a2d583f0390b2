//! Interest-list backend built on `epoll(7)`.
//!
//! Edge, level and one-shot delivery are native epoll flags. The kernel event
//! carries only the descriptor, so the unread byte count is queried with
//! `FIONREAD` once the event has been collected.

use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;
use std::{cmp, io, mem};

use libc::{c_int, EPOLLET, EPOLLHUP, EPOLLIN, EPOLLONESHOT};
use log::warn;

use crate::event::{self, Event, Mode};
use crate::sys::cvt;

#[derive(Debug)]
pub(crate) struct Selector {
    epfd: RawFd,
}

impl Selector {
    pub(crate) fn new() -> io::Result<Selector> {
        let epfd = cvt(unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) })?;
        Ok(Selector { epfd })
    }

    /// Adds read interest for `fd`; a descriptor that is already in the
    /// interest list has its mode replaced instead.
    pub(crate) fn register(&self, fd: RawFd, mode: Mode) -> io::Result<()> {
        match self.ctl(libc::EPOLL_CTL_ADD, fd, mode) {
            Err(ref e) if e.raw_os_error() == Some(libc::EEXIST) => {
                self.ctl(libc::EPOLL_CTL_MOD, fd, mode)
            }
            res => res,
        }
    }

    /// Arms a fresh one-shot read interest for `fd`.
    pub(crate) fn rearm(&self, fd: RawFd) -> io::Result<()> {
        match self.ctl(libc::EPOLL_CTL_MOD, fd, Mode::OneShot) {
            Err(ref e) if e.raw_os_error() == Some(libc::ENOENT) => {
                self.ctl(libc::EPOLL_CTL_ADD, fd, Mode::OneShot)
            }
            res => res,
        }
    }

    fn ctl(&self, op: c_int, fd: RawFd, mode: Mode) -> io::Result<()> {
        let mut info = libc::epoll_event {
            events: interest_to_epoll(mode),
            u64: fd as u64,
        };

        cvt(unsafe { libc::epoll_ctl(self.epfd, op, fd, &mut info) }).map(|_| ())
    }

    /// Waits for at most one ready descriptor. An interrupted wait is
    /// reported as `ErrorKind::Interrupted`.
    pub(crate) fn select(&self, timeout: Option<Duration>) -> io::Result<Option<Event>> {
        let timeout = timeout.map(timeout_to_ms).unwrap_or(-1);
        let mut info: libc::epoll_event = unsafe { mem::zeroed() };

        let n = cvt(unsafe { libc::epoll_wait(self.epfd, &mut info, 1, timeout) })?;
        if n == 0 {
            return Ok(None);
        }

        let fd = info.u64 as RawFd;
        let hup = (info.events & EPOLLHUP as u32) != 0;

        Ok(Some(event::with_hup(
            Event::new(fd, bytes_available(fd)),
            hup,
        )))
    }

    pub(crate) fn close(self) -> io::Result<()> {
        let epfd = self.epfd;
        mem::forget(self);
        cvt(unsafe { libc::close(epfd) }).map(|_| ())
    }
}

impl AsRawFd for Selector {
    fn as_raw_fd(&self) -> RawFd {
        self.epfd
    }
}

impl Drop for Selector {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::close(self.epfd);
        }
    }
}

fn interest_to_epoll(mode: Mode) -> u32 {
    let kind = match mode {
        Mode::Edge => EPOLLIN | EPOLLET,
        Mode::Level => EPOLLIN,
        Mode::OneShot => EPOLLIN | EPOLLONESHOT,
    };

    kind as u32
}

/// Converts a timeout to whole milliseconds, rounding up so that a short
/// non-zero timeout does not turn into a non-blocking poll.
fn timeout_to_ms(timeout: Duration) -> c_int {
    let rounded = timeout
        .checked_add(Duration::from_nanos(999_999))
        .unwrap_or(timeout);

    cmp::min(rounded.as_millis(), c_int::max_value() as u128) as c_int
}

fn bytes_available(fd: RawFd) -> usize {
    let mut n: c_int = 0;

    match cvt(unsafe { libc::ioctl(fd, libc::FIONREAD, &mut n as *mut c_int) }) {
        Ok(_) => cmp::max(n, 0) as usize,
        Err(e) => {
            warn!("FIONREAD on fd {} failed: {}", fd, e);
            0
        }
    }
}
