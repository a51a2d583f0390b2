use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::event::{Event, Mode};
use crate::sys::{self, Backend};

/// A read-readiness notification context.
///
/// A `Poller` owns one kernel queue (`epoll` or `kqueue`, see [`BACKEND`]).
/// Descriptors are registered by number and stay owned by the caller: the
/// poller never reads from them, except to learn how many bytes are unread,
/// and never closes them. Closing the poller drops every registration it
/// holds.
///
/// A poller is driven by one thread issuing sequential calls. [`wait`]
/// takes `&mut self`, so sharing one poller across threads needs an outer
/// lock. A blocking wait is only cut short by its timeout; to interrupt it,
/// register an extra descriptor such as the read end of a [`pipe`] and
/// write to it.
///
/// # Errors
///
/// Every operation surfaces the kernel call's failure as an `io::Error`.
/// None of them is expected to fail for a valid, open, non-blocking
/// descriptor; a failure means resource exhaustion or a caller bug and is
/// not worth retrying. A timeout is not an error: [`wait`] returns
/// `Ok(None)`.
///
/// # Examples
///
/// One-shot registrations stay silent until they are re-armed.
///
/// ```
/// use std::io::Write;
/// use std::os::unix::io::AsRawFd;
/// use std::time::Duration;
///
/// use net_poller::{pipe, Mode, Poller};
///
/// # fn main() -> std::io::Result<()> {
/// let timeout = Some(Duration::from_millis(50));
/// let (rx, mut tx) = pipe()?;
/// let mut poller = Poller::new()?;
/// poller.register_read(rx.as_raw_fd(), Mode::OneShot)?;
///
/// tx.write_all(b"abcdefgh")?;
/// assert_eq!(poller.wait(timeout)?.map(|e| e.available()), Some(8));
///
/// tx.write_all(b"ijklmnop")?;
/// assert!(poller.wait(timeout)?.is_none());
///
/// poller.rearm_read(rx.as_raw_fd())?;
/// assert_eq!(poller.wait(timeout)?.map(|e| e.available()), Some(16));
/// # Ok(())
/// # }
/// ```
///
/// [`BACKEND`]: constant.BACKEND.html
/// [`wait`]: #method.wait
/// [`pipe`]: fn.pipe.html
#[derive(Debug)]
pub struct Poller {
    selector: sys::Selector,
}

impl Poller {
    /// Creates a new notification context.
    ///
    /// The kernel object is created close-on-exec.
    ///
    /// # Errors
    ///
    /// Fails when the kernel cannot allocate the queue, typically because the
    /// process or system is out of descriptors.
    pub fn new() -> io::Result<Poller> {
        let selector = sys::Selector::new()?;
        debug!("created {} poller; fd={}", sys::BACKEND, selector.as_raw_fd());
        Ok(Poller { selector })
    }

    /// Returns the backend this poller runs on.
    pub fn backend(&self) -> Backend {
        sys::BACKEND
    }

    /// Registers `fd` for read-readiness under `mode`.
    ///
    /// `fd` must be open and should be non-blocking (see [`set_nonblock`]).
    /// Registering a descriptor that is already registered replaces its
    /// mode; it never adds a second interest.
    ///
    /// # Errors
    ///
    /// Fails when the kernel rejects the registration, e.g. for a closed
    /// descriptor or one that cannot be polled.
    ///
    /// [`set_nonblock`]: fn.set_nonblock.html
    pub fn register_read(&self, fd: RawFd, mode: Mode) -> io::Result<()> {
        trace!("registering fd={} mode={}", fd, mode);
        self.selector.register(fd, mode)
    }

    /// Arms `fd` for exactly one more readiness event.
    ///
    /// This submits a fresh one-shot registration, so it is meant to follow
    /// a [`Mode::OneShot`] event that has been consumed. Called on a
    /// descriptor registered under another mode, or not registered at all,
    /// it converts the descriptor to an armed one-shot registration.
    ///
    /// # Errors
    ///
    /// Fails when the kernel rejects the registration.
    ///
    /// [`Mode::OneShot`]: enum.Mode.html#variant.OneShot
    pub fn rearm_read(&self, fd: RawFd) -> io::Result<()> {
        trace!("re-arming fd={}", fd);
        self.selector.rearm(fd)
    }

    /// Waits for one registered descriptor to become ready.
    ///
    /// Returns `Ok(None)` when `timeout` elapses first; `None` as timeout
    /// blocks until an event arrives. At most one event is returned per call,
    /// even when several descriptors are ready; call again to collect the
    /// others.
    ///
    /// A wait interrupted by a signal is resumed with whatever is left of
    /// `timeout`, so `Ok(None)` always means the timeout ran out.
    ///
    /// # Errors
    ///
    /// Fails when the kernel wait call fails.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Option<Event>> {
        let deadline = timeout.and_then(|to| Instant::now().checked_add(to));
        let mut remaining = timeout;

        let event = loop {
            match self.selector.select(remaining) {
                Ok(event) => break event,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                    trace!("wait interrupted by a signal; resuming");
                    if let Some(deadline) = deadline {
                        remaining = Some(deadline.saturating_duration_since(Instant::now()));
                    }
                }
                Err(e) => return Err(e),
            }
        };

        match event {
            Some(ref e) => trace!(
                "fd={} ready; available={} hup={}",
                e.fd(),
                e.available(),
                e.is_hup()
            ),
            None => trace!("wait timed out; timeout={:?}", timeout),
        }
        Ok(event)
    }

    /// Same as [`wait`], with the timeout in milliseconds. A negative value
    /// blocks until an event arrives.
    ///
    /// # Errors
    ///
    /// Fails when the kernel wait call fails.
    ///
    /// [`wait`]: #method.wait
    pub fn wait_ms(&mut self, timeout_ms: i32) -> io::Result<Option<Event>> {
        let timeout = if timeout_ms < 0 {
            None
        } else {
            Some(Duration::from_millis(timeout_ms as u64))
        };
        self.wait(timeout)
    }

    /// Closes the poller, dropping all of its registrations.
    ///
    /// The registered descriptors are left open. Dropping a `Poller` has the
    /// same effect but ignores the result of `close(2)`.
    ///
    /// # Errors
    ///
    /// Fails when `close(2)` reports an error for the kernel object.
    pub fn close(self) -> io::Result<()> {
        debug!("closing {} poller; fd={}", sys::BACKEND, self.as_raw_fd());
        self.selector.close()
    }
}

impl AsRawFd for Poller {
    fn as_raw_fd(&self) -> RawFd {
        self.selector.as_raw_fd()
    }
}
