use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use crate::sys::cvt;

/// Puts `fd` in non-blocking mode.
///
/// Descriptors must be non-blocking before they are registered: the poller
/// assumes the caller can read until `WouldBlock` without stalling.
pub fn set_nonblock(fd: RawFd) -> io::Result<()> {
    unsafe {
        let flags = cvt(libc::fcntl(fd, libc::F_GETFL))?;
        cvt(libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK)).map(|_| ())
    }
}

/// Marks `fd` close-on-exec.
pub fn set_cloexec(fd: RawFd) -> io::Result<()> {
    unsafe {
        let flags = cvt(libc::fcntl(fd, libc::F_GETFD))?;
        cvt(libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC)).map(|_| ())
    }
}

/// Creates a non-blocking, close-on-exec pipe.
///
/// Returns the read end first.
///
/// # Examples
///
/// ```
/// use std::io::{ErrorKind, Read, Write};
///
/// # fn main() -> std::io::Result<()> {
/// let (mut rx, mut tx) = net_poller::pipe()?;
/// let mut buf = [0; 8];
///
/// assert_eq!(rx.read(&mut buf).unwrap_err().kind(), ErrorKind::WouldBlock);
///
/// tx.write_all(b"ping")?;
/// assert_eq!(rx.read(&mut buf)?, 4);
/// # Ok(())
/// # }
/// ```
pub fn pipe() -> io::Result<(Io, Io)> {
    let mut fds = [0; 2];
    open_pipe(&mut fds)?;
    Ok((Io { fd: fds[0] }, Io { fd: fds[1] }))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn open_pipe(fds: &mut [libc::c_int; 2]) -> io::Result<()> {
    let flags = libc::O_NONBLOCK | libc::O_CLOEXEC;
    cvt(unsafe { libc::pipe2(fds.as_mut_ptr(), flags) }).map(|_| ())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn open_pipe(fds: &mut [libc::c_int; 2]) -> io::Result<()> {
    cvt(unsafe { libc::pipe(fds.as_mut_ptr()) })?;

    // Owned until the flags are set, so a failure closes both ends.
    let ends = [Io { fd: fds[0] }, Io { fd: fds[1] }];
    for end in &ends {
        set_cloexec(end.fd)?;
        set_nonblock(end.fd)?;
    }
    std::mem::forget(ends);
    Ok(())
}

/// An owned descriptor.
///
/// The descriptor is closed when the `Io` is dropped. Registering it with a
/// [`Poller`] does not transfer ownership.
///
/// [`Poller`]: struct.Poller.html
#[derive(Debug)]
pub struct Io {
    fd: RawFd,
}

impl Io {
    /// Duplicates the descriptor; the copy is close-on-exec.
    pub fn try_clone(&self) -> io::Result<Io> {
        let fd = cvt(unsafe { libc::fcntl(self.fd, libc::F_DUPFD_CLOEXEC, 0) })?;
        Ok(Io { fd })
    }

    fn read_fd(&self, dst: &mut [u8]) -> io::Result<usize> {
        let buf = dst.as_mut_ptr() as *mut libc::c_void;
        let n = cvt(unsafe { libc::read(self.fd, buf, dst.len()) })?;
        Ok(n as usize)
    }

    fn write_fd(&self, src: &[u8]) -> io::Result<usize> {
        let buf = src.as_ptr() as *const libc::c_void;
        let n = cvt(unsafe { libc::write(self.fd, buf, src.len()) })?;
        Ok(n as usize)
    }
}

impl Drop for Io {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::close(self.fd);
        }
    }
}

impl FromRawFd for Io {
    unsafe fn from_raw_fd(fd: RawFd) -> Io {
        Io { fd }
    }
}

impl AsRawFd for Io {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Read for Io {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.read_fd(dst)
    }
}

impl<'a> Read for &'a Io {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.read_fd(dst)
    }
}

impl Write for Io {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.write_fd(src)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> Write for &'a Io {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.write_fd(src)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
