mod io;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) use self::epoll::Selector;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod kqueue;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) use self::kqueue::Selector;

pub use self::io::{pipe, set_cloexec, set_nonblock, Io};
