//! Readiness event types

use std::error::Error;
use std::fmt;
use std::os::unix::io::RawFd;
use std::str::FromStr;

/// Delivery mode of a read registration.
///
/// The mode is fixed when a descriptor is registered with
/// [`Poller::register_read`] and only changes through a re-registration,
/// which is what [`Poller::rearm_read`] does.
///
/// | Scenario | `Edge` | `Level` | `OneShot` |
/// |---|---|---|---|
/// | data arrives, never read | fires once | fires on every wait | fires once |
/// | partial read | backend dependent | fires again | silent until re-armed |
/// | full read | silent until new data | silent until new data | silent until re-armed |
/// | more data after a drain | fires again | fires again | silent until re-armed |
///
/// The partial read case in edge mode is governed by
/// [`Backend::edge_refires_on_partial_read`].
///
/// # Examples
///
/// ```
/// use net_poller::Mode;
///
/// let mode: Mode = "oneshot".parse().unwrap();
///
/// assert_eq!(mode, Mode::OneShot);
/// assert_eq!(mode.to_string(), "OneShot");
/// ```
///
/// [`Poller::register_read`]: ../struct.Poller.html#method.register_read
/// [`Poller::rearm_read`]: ../struct.Poller.html#method.rearm_read
/// [`Backend::edge_refires_on_partial_read`]: ../enum.Backend.html#method.edge_refires_on_partial_read
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Notify once per transition from "no unread data" to "unread data".
    Edge,
    /// Notify on every wait while any unread data remains.
    Level,
    /// Notify exactly once, then stay inert until re-armed.
    OneShot,
}

impl Mode {
    /// Returns true if the mode is `Edge`.
    #[inline]
    pub fn is_edge(self) -> bool {
        self == Mode::Edge
    }

    /// Returns true if the mode is `Level`.
    #[inline]
    pub fn is_level(self) -> bool {
        self == Mode::Level
    }

    /// Returns true if the mode is `OneShot`.
    #[inline]
    pub fn is_oneshot(self) -> bool {
        self == Mode::OneShot
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match *self {
            Mode::Edge => "Edge-Triggered",
            Mode::Level => "Level-Triggered",
            Mode::OneShot => "OneShot",
        };
        fmt.write_str(msg)
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Mode, ParseModeError> {
        match s.to_ascii_lowercase().as_str() {
            "edge" => Ok(Mode::Edge),
            "level" => Ok(Mode::Level),
            "oneshot" => Ok(Mode::OneShot),
            _ => Err(ParseModeError {
                input: s.to_owned(),
            }),
        }
    }
}

/// Error returned when parsing a [`Mode`] from text fails.
///
/// [`Mode`]: enum.Mode.html
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseModeError {
    input: String,
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "unknown poll mode `{}`, expected one of `edge`, `level`, `oneshot`",
            self.input
        )
    }
}

impl Error for ParseModeError {}

/// Direction of interest for a registration.
///
/// Only `In` is registered by this crate. `Out` and `InOut` exist so the
/// enumeration keeps its values when write interest is added.
///
/// # Examples
///
/// ```
/// use net_poller::Filter;
///
/// assert!(Filter::InOut.contains(Filter::In));
/// assert!(Filter::InOut.is_writable());
/// assert!(!Filter::In.contains(Filter::Out));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Filter {
    /// Read readiness.
    In = 1,
    /// Write readiness.
    Out = 2,
    /// Read and write readiness.
    InOut = 3,
}

impl Filter {
    /// Returns true if the filter includes read readiness.
    #[inline]
    pub fn is_readable(self) -> bool {
        self.contains(Filter::In)
    }

    /// Returns true if the filter includes write readiness.
    #[inline]
    pub fn is_writable(self) -> bool {
        self.contains(Filter::Out)
    }

    /// Returns true if every direction in `other` is also in `self`.
    #[inline]
    pub fn contains(self, other: Filter) -> bool {
        (self as u8 & other as u8) == other as u8
    }
}

/// A readiness event returned by [`Poller::wait`].
///
/// The byte count is a snapshot taken when the event was collected. More
/// data may have arrived, or another reader may have drained some, by the
/// time the caller reads.
///
/// # Examples
///
/// ```
/// use net_poller::Event;
///
/// let event = Event::new(3, 8);
///
/// assert_eq!(event.fd(), 3);
/// assert_eq!(event.available(), 8);
/// assert!(!event.is_hup());
/// ```
///
/// [`Poller::wait`]: ../struct.Poller.html#method.wait
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Event {
    fd: RawFd,
    available: usize,
    hup: bool,
}

impl Event {
    /// Creates a new `Event` for `fd` with `available` unread bytes.
    pub fn new(fd: RawFd, available: usize) -> Event {
        Event {
            fd,
            available,
            hup: false,
        }
    }

    /// Returns the descriptor that became ready.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Returns how many unread bytes the descriptor held.
    pub fn available(&self) -> usize {
        self.available
    }

    /// Returns true if the write side of the descriptor has hung up.
    ///
    /// A hung up descriptor stays readable: the remaining bytes can still be
    /// read, after which reads return end of file.
    pub fn is_hup(&self) -> bool {
        self.hup
    }
}

// Used by the backends to flag a hang-up on a freshly built event.
pub(crate) fn with_hup(mut event: Event, hup: bool) -> Event {
    event.hup = hup;
    event
}

#[test]
fn test_display_mode() {
    assert_eq!("Edge-Triggered", Mode::Edge.to_string());
    assert_eq!("Level-Triggered", Mode::Level.to_string());
    assert_eq!("OneShot", Mode::OneShot.to_string());
}

#[test]
fn test_parse_mode() {
    assert_eq!(Ok(Mode::Edge), "edge".parse::<Mode>());
    assert_eq!(Ok(Mode::Level), "LEVEL".parse::<Mode>());
    assert_eq!(Ok(Mode::OneShot), "OneShot".parse::<Mode>());

    let err = "sometimes".parse::<Mode>().unwrap_err();
    assert!(err.to_string().contains("`sometimes`"));
}

#[test]
fn test_filter_values() {
    assert_eq!(1, Filter::In as u8);
    assert_eq!(2, Filter::Out as u8);
    assert_eq!(Filter::In as u8 | Filter::Out as u8, Filter::InOut as u8);

    assert!(Filter::In.is_readable());
    assert!(!Filter::In.is_writable());
    assert!(!Filter::Out.is_readable());
    assert!(Filter::InOut.contains(Filter::Out));
    assert!(!Filter::Out.contains(Filter::InOut));
}

#[test]
fn test_event_hup() {
    let event = with_hup(Event::new(5, 0), true);

    assert!(event.is_hup());
    assert_eq!(event.available(), 0);
    assert_ne!(event, Event::new(5, 0));
}
