use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use std::{mem, ptr, thread};

use net_poller::{pipe, Backend, Event, Io, Mode, Poller, BACKEND};

const TIMEOUT: Option<Duration> = Some(Duration::from_millis(50));

struct Pipe {
    poller: Poller,
    rx: Io,
    tx: Io,
}

impl Pipe {
    fn new(mode: Mode) -> Pipe {
        let _ = env_logger::try_init();

        let (rx, tx) = pipe().unwrap();
        let poller = Poller::new().unwrap();
        poller.register_read(rx.as_raw_fd(), mode).unwrap();

        Pipe { poller, rx, tx }
    }

    fn fd(&self) -> RawFd {
        self.rx.as_raw_fd()
    }

    fn write(&self, data: &[u8]) {
        (&self.tx).write_all(data).unwrap();
    }

    fn read(&self, n: usize) -> Vec<u8> {
        let mut buf = vec![0; n];
        assert_eq!((&self.rx).read(&mut buf).unwrap(), n);
        buf
    }

    fn wait(&mut self) -> Option<Event> {
        self.poller.wait(TIMEOUT).unwrap()
    }

    fn rearm(&self) {
        self.poller.rearm_read(self.fd()).unwrap();
    }

    #[track_caller]
    fn expect_ready(&mut self, available: usize) {
        let fd = self.fd();
        let event = self.wait().expect("expected a readiness event");
        assert_eq!(event.fd(), fd);
        assert_eq!(event.available(), available);
    }

    #[track_caller]
    fn expect_timeout(&mut self) {
        assert_eq!(self.wait(), None);
    }
}

#[test]
fn edge_read_none() {
    let mut p = Pipe::new(Mode::Edge);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    // Nothing new arrived.
    p.expect_timeout();

    p.write(b"ijklmnop");
    p.expect_ready(16);
}

#[test]
fn edge_read_some() {
    let mut p = Pipe::new(Mode::Edge);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    assert_eq!(p.read(4), b"abcd");

    // epoll waits for new data; kqueue reports the unread remainder.
    match BACKEND {
        Backend::Epoll => p.expect_timeout(),
        Backend::Kqueue => p.expect_ready(4),
    }
    assert_eq!(
        BACKEND.edge_refires_on_partial_read(),
        BACKEND == Backend::Kqueue
    );

    p.write(b"ijklmnop");
    p.expect_ready(12);
    assert_eq!(p.read(12), b"efghijklmnop");
}

#[test]
fn edge_read_all() {
    let mut p = Pipe::new(Mode::Edge);

    p.write(b"abcdefgh");
    p.expect_ready(8);
    assert_eq!(p.read(8), b"abcdefgh");

    p.expect_timeout();

    p.write(b"ijklmnop");
    p.expect_ready(8);
    assert_eq!(p.read(8), b"ijklmnop");
}

#[test]
fn edge_read_more() {
    let mut p = Pipe::new(Mode::Edge);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    // Write more before reading.
    p.write(b"ijklmnop");
    assert_eq!(p.read(8), b"abcdefgh");

    p.expect_ready(8);
    assert_eq!(p.read(8), b"ijklmnop");
}

#[test]
fn level_read_none() {
    let mut p = Pipe::new(Mode::Level);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    // Unread data keeps firing.
    p.expect_ready(8);
    p.expect_ready(8);

    p.write(b"ijklmnop");
    p.expect_ready(16);
}

#[test]
fn level_read_some() {
    let mut p = Pipe::new(Mode::Level);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    assert_eq!(p.read(4), b"abcd");
    p.expect_ready(4);

    p.write(b"ijklmnop");
    p.expect_ready(12);
    assert_eq!(p.read(12), b"efghijklmnop");
}

#[test]
fn level_read_all() {
    let mut p = Pipe::new(Mode::Level);

    p.write(b"abcdefgh");
    p.expect_ready(8);
    assert_eq!(p.read(8), b"abcdefgh");

    p.expect_timeout();

    p.write(b"ijklmnop");
    p.expect_ready(8);
    assert_eq!(p.read(8), b"ijklmnop");
}

#[test]
fn level_read_more() {
    let mut p = Pipe::new(Mode::Level);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    p.write(b"ijklmnop");
    assert_eq!(p.read(8), b"abcdefgh");

    p.expect_ready(8);
    assert_eq!(p.read(8), b"ijklmnop");
}

#[test]
fn oneshot_read_none() {
    let mut p = Pipe::new(Mode::OneShot);

    p.write(b"abcdefgh");
    p.expect_ready(8);
    p.expect_timeout();

    // Disarmed: new data does not fire either.
    p.write(b"ijklmnop");
    p.expect_timeout();

    p.rearm();
    p.expect_ready(16);
    p.expect_timeout();
}

#[test]
fn oneshot_read_some() {
    let mut p = Pipe::new(Mode::OneShot);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    assert_eq!(p.read(4), b"abcd");
    p.expect_timeout();

    // Each re-arm yields one event while the remainder is unread.
    p.rearm();
    p.expect_ready(4);
    p.rearm();
    p.expect_ready(4);

    p.rearm();
    p.write(b"ijklmnop");
    p.expect_ready(12);
    assert_eq!(p.read(12), b"efghijklmnop");
}

#[test]
fn oneshot_read_all() {
    let mut p = Pipe::new(Mode::OneShot);

    p.write(b"abcdefgh");
    p.expect_ready(8);
    assert_eq!(p.read(8), b"abcdefgh");

    p.expect_timeout();

    p.write(b"ijklmnop");
    p.expect_timeout();

    p.rearm();
    p.expect_ready(8);
    assert_eq!(p.read(8), b"ijklmnop");
}

#[test]
fn oneshot_read_more() {
    let mut p = Pipe::new(Mode::OneShot);

    p.write(b"abcdefgh");
    p.expect_ready(8);

    p.write(b"ijklmnop");
    assert_eq!(p.read(8), b"abcdefgh");

    p.expect_timeout();

    p.rearm();
    p.expect_ready(8);
    assert_eq!(p.read(8), b"ijklmnop");
}

#[test]
fn hangup_is_reported_with_remaining_bytes() {
    let Pipe { mut poller, rx, tx } = Pipe::new(Mode::Level);

    (&tx).write_all(b"abcd").unwrap();
    drop(tx);

    let event = poller.wait(TIMEOUT).unwrap().expect("readable after hang-up");
    assert_eq!(event.fd(), rx.as_raw_fd());
    assert_eq!(event.available(), 4);
    assert!(event.is_hup());

    let mut buf = [0; 8];
    assert_eq!((&rx).read(&mut buf).unwrap(), 4);

    let event = poller.wait(TIMEOUT).unwrap().expect("end of file stays readable");
    assert_eq!(event.available(), 0);
    assert!(event.is_hup());
    assert_eq!((&rx).read(&mut buf).unwrap(), 0);
}

#[test]
fn rearm_without_registration_arms_oneshot() {
    let _ = env_logger::try_init();

    let (rx, tx) = pipe().unwrap();
    let mut poller = Poller::new().unwrap();

    poller.rearm_read(rx.as_raw_fd()).unwrap();

    (&tx).write_all(b"abcdefgh").unwrap();
    let event = poller.wait(TIMEOUT).unwrap().unwrap();
    assert_eq!(event.fd(), rx.as_raw_fd());
    assert_eq!(event.available(), 8);

    (&tx).write_all(b"ijklmnop").unwrap();
    assert_eq!(poller.wait(TIMEOUT).unwrap(), None);
}

#[test]
fn rearm_converts_level_to_oneshot() {
    let mut p = Pipe::new(Mode::Level);

    p.write(b"abcdefgh");
    p.expect_ready(8);
    p.expect_ready(8);

    p.rearm();
    p.expect_ready(8);
    p.expect_timeout();
}

#[test]
fn register_twice_changes_mode() {
    let mut p = Pipe::new(Mode::Level);
    let fd = p.fd();
    p.poller.register_read(fd, Mode::OneShot).unwrap();

    p.write(b"abcdefgh");
    p.expect_ready(8);
    p.expect_timeout();
}

#[test]
fn wait_without_timeout_returns_pending_event() {
    let mut p = Pipe::new(Mode::Level);
    p.write(b"abcdefgh");

    let event = p.poller.wait(None).unwrap().unwrap();
    assert_eq!(event.fd(), p.fd());

    let event = p.poller.wait_ms(-1).unwrap().unwrap();
    assert_eq!(event.available(), 8);
}

#[test]
fn wait_ms_zero_polls() {
    let mut p = Pipe::new(Mode::Level);
    assert_eq!(p.poller.wait_ms(0).unwrap(), None);

    p.write(b"a");
    assert_eq!(p.poller.wait_ms(50).unwrap().map(|e| e.available()), Some(1));
}

#[test]
fn one_event_per_wait() {
    let _ = env_logger::try_init();

    let (rx1, tx1) = pipe().unwrap();
    let (rx2, tx2) = pipe().unwrap();
    let mut poller = Poller::new().unwrap();
    poller.register_read(rx1.as_raw_fd(), Mode::Edge).unwrap();
    poller.register_read(rx2.as_raw_fd(), Mode::Edge).unwrap();

    (&tx1).write_all(b"abcdefgh").unwrap();
    (&tx2).write_all(b"abcd").unwrap();

    let first = poller.wait(TIMEOUT).unwrap().unwrap();
    let second = poller.wait(TIMEOUT).unwrap().unwrap();
    assert_eq!(poller.wait(TIMEOUT).unwrap(), None);

    let mut seen = vec![(first.fd(), first.available()), (second.fd(), second.available())];
    seen.sort();
    let mut expected = vec![(rx1.as_raw_fd(), 8), (rx2.as_raw_fd(), 4)];
    expected.sort();
    assert_eq!(seen, expected);
}

#[test]
fn closing_one_poller_leaves_others_intact() {
    let _ = env_logger::try_init();

    let (rx, tx) = pipe().unwrap();
    let closed = Poller::new().unwrap();
    let mut live = Poller::new().unwrap();
    closed.register_read(rx.as_raw_fd(), Mode::Level).unwrap();
    live.register_read(rx.as_raw_fd(), Mode::Level).unwrap();

    closed.close().unwrap();

    (&tx).write_all(b"abcdefgh").unwrap();
    let event = live.wait(TIMEOUT).unwrap().unwrap();
    assert_eq!(event.fd(), rx.as_raw_fd());
    assert_eq!(event.available(), 8);

    // The descriptor itself is still open.
    let mut buf = [0; 8];
    assert_eq!((&rx).read(&mut buf).unwrap(), 8);
}

#[test]
fn backend_matches_target() {
    let poller = Poller::new().unwrap();

    if cfg!(any(target_os = "linux", target_os = "android")) {
        assert_eq!(poller.backend(), Backend::Epoll);
    } else {
        assert_eq!(poller.backend(), Backend::Kqueue);
    }
    assert!(poller.as_raw_fd() >= 0);
}

extern "C" fn ignore_signal(_: libc::c_int) {}

// Without SA_RESTART, so a blocked wait fails with EINTR.
fn install_sigusr1_handler() {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = ignore_signal as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        assert_eq!(libc::sigaction(libc::SIGUSR1, &action, ptr::null_mut()), 0);
    }
}

// Runs `wait` on a second thread, interrupting it with SIGUSR1 after 50ms.
// Returns the wait result and how long the call took.
fn wait_through_signal(
    mut poller: Poller,
    timeout: Option<Duration>,
    after_signal: impl FnOnce(),
) -> (Option<Event>, Duration) {
    install_sigusr1_handler();

    let (tid_tx, tid_rx) = mpsc::channel();
    let waiter = thread::spawn(move || {
        tid_tx.send(unsafe { libc::pthread_self() } as usize).unwrap();
        let start = Instant::now();
        let event = poller.wait(timeout).unwrap();
        (event, start.elapsed())
    });

    let tid = tid_rx.recv().unwrap() as libc::pthread_t;
    thread::sleep(Duration::from_millis(50));
    assert_eq!(unsafe { libc::pthread_kill(tid, libc::SIGUSR1) }, 0);

    after_signal();
    waiter.join().unwrap()
}

#[test]
fn infinite_wait_survives_signal() {
    let _ = env_logger::try_init();

    let (rx, tx) = pipe().unwrap();
    let poller = Poller::new().unwrap();
    poller.register_read(rx.as_raw_fd(), Mode::Level).unwrap();

    let (event, _) = wait_through_signal(poller, None, || {
        thread::sleep(Duration::from_millis(50));
        (&tx).write_all(b"abcdefgh").unwrap();
    });

    let event = event.expect("an infinite wait only returns with an event");
    assert_eq!(event.fd(), rx.as_raw_fd());
    assert_eq!(event.available(), 8);
}

#[test]
fn timed_wait_survives_signal() {
    let _ = env_logger::try_init();

    let (rx, _tx) = pipe().unwrap();
    let poller = Poller::new().unwrap();
    poller.register_read(rx.as_raw_fd(), Mode::Level).unwrap();

    let timeout = Duration::from_millis(300);
    let (event, elapsed) = wait_through_signal(poller, Some(timeout), || {});

    assert_eq!(event, None);
    assert!(elapsed >= timeout, "timed out early after {:?}", elapsed);
}
