//! Event-queue backend built on `kqueue(2)`.
//!
//! One-shot delivery is native (`EV_ONESHOT`), edge delivery is `EV_CLEAR`
//! and level delivery is a plain `EV_ADD`. Re-arming submits the same
//! one-shot registration again. The read filter reports the unread byte
//! count in the event's `data` field, so no follow-up query is needed.

use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;
use std::{cmp, io, mem, ptr};

use crate::event::{self, Event, Mode};
use crate::sys::{cvt, set_cloexec};

// `kevent.flags` is wider on NetBSD.
#[cfg(target_os = "netbsd")]
type Flags = u32;
#[cfg(not(target_os = "netbsd"))]
type Flags = u16;

#[derive(Debug)]
pub(crate) struct Selector {
    kq: RawFd,
}

impl Selector {
    pub(crate) fn new() -> io::Result<Selector> {
        let kq = cvt(unsafe { libc::kqueue() })?;
        let selector = Selector { kq };
        set_cloexec(kq)?;
        Ok(selector)
    }

    /// Adds read interest for `fd`. `EV_ADD` on an existing registration
    /// replaces its flags, so this doubles as a mode change.
    pub(crate) fn register(&self, fd: RawFd, mode: Mode) -> io::Result<()> {
        let mut kev: libc::kevent = unsafe { mem::zeroed() };
        kev.ident = fd as libc::uintptr_t;
        kev.filter = libc::EVFILT_READ;
        kev.flags = interest_to_flags(mode);

        cvt(unsafe { libc::kevent(self.kq, &kev, 1, ptr::null_mut(), 0, ptr::null()) })
            .map(|_| ())
    }

    /// Arms a fresh one-shot read interest for `fd`.
    pub(crate) fn rearm(&self, fd: RawFd) -> io::Result<()> {
        self.register(fd, Mode::OneShot)
    }

    /// Waits for at most one ready descriptor. An interrupted wait is
    /// reported as `ErrorKind::Interrupted`.
    pub(crate) fn select(&self, timeout: Option<Duration>) -> io::Result<Option<Event>> {
        let timeout = timeout.map(|to| libc::timespec {
            tv_sec: cmp::min(to.as_secs(), libc::time_t::max_value() as u64) as libc::time_t,
            tv_nsec: to.subsec_nanos() as libc::c_long,
        });
        let timeout = timeout
            .as_ref()
            .map(|s| s as *const libc::timespec)
            .unwrap_or(ptr::null());

        let mut kev: libc::kevent = unsafe { mem::zeroed() };

        let n = cvt(unsafe { libc::kevent(self.kq, ptr::null(), 0, &mut kev, 1, timeout) })?;
        if n == 0 {
            return Ok(None);
        }

        let fd = kev.ident as RawFd;
        let hup = (kev.flags & libc::EV_EOF) != 0;

        Ok(Some(event::with_hup(
            Event::new(fd, cmp::max(kev.data, 0) as usize),
            hup,
        )))
    }

    pub(crate) fn close(self) -> io::Result<()> {
        let kq = self.kq;
        mem::forget(self);
        cvt(unsafe { libc::close(kq) }).map(|_| ())
    }
}

impl AsRawFd for Selector {
    fn as_raw_fd(&self) -> RawFd {
        self.kq
    }
}

impl Drop for Selector {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::close(self.kq);
        }
    }
}

fn interest_to_flags(mode: Mode) -> Flags {
    match mode {
        Mode::Edge => libc::EV_ADD | libc::EV_CLEAR,
        Mode::Level => libc::EV_ADD,
        Mode::OneShot => libc::EV_ADD | libc::EV_ONESHOT,
    }
}
