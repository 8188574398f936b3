//! Capabilities supplied by the embedding event loop.
//!
//! The driver performs no I/O multiplexing of its own: waiting is expressed
//! entirely as registering interest with these capabilities and returning
//! control to the caller's event loop. One [`Timer`] and one
//! [`SocketWatcher`] per driver instance, used exclusively by it.

use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::time::Duration;

/// Directions of interest for a level-triggered socket watch. Also used to
/// report which of the watched directions are ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
    ReadWrite,
}

impl Interest {
    /// Whether readability is included.
    pub fn is_readable(self) -> bool {
        matches!(self, Interest::Read | Interest::ReadWrite)
    }

    /// Whether writability is included.
    pub fn is_writable(self) -> bool {
        matches!(self, Interest::Write | Interest::ReadWrite)
    }
}

/// Callback invoked by a [`SocketWatcher`] when a watched socket is ready.
pub type ReadyFn = Box<dyn Fn(RawFd, Interest)>;

/// Callback invoked by a [`Timer`] when its countdown elapses.
pub type ExpireFn = Box<dyn FnOnce()>;

/// One-shot countdown timer.
///
/// The driver keeps at most one deadline pending; `start` replaces any
/// previous arm. Implementations must deliver `on_expire` from the event
/// loop, never from inside `start` itself.
pub trait Timer {
    /// Arm the countdown, replacing any previous arm.
    fn start(&self, timeout: Duration, on_expire: ExpireFn);

    /// Cancel a pending arm. No-op when none is pending.
    fn stop(&self);
}

/// Level-triggered socket readiness notification.
///
/// There is no modify operation: a change of watched direction is expressed
/// as stop-then-rewatch by the caller.
pub trait SocketWatcher {
    /// Begin invoking `on_ready` whenever `socket` is ready in one of
    /// `interest`'s directions. Replaces nothing: the caller stops an
    /// existing watch before establishing a new one.
    fn watch(&self, socket: RawFd, interest: Interest, on_ready: ReadyFn);

    /// End notifications for `socket`. No-op when it is not being watched.
    fn stop_watching(&self, socket: RawFd);
}

/// Socket kind requested through a [`SocketFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Stream,
    Datagram,
}

/// Optional capability routing socket creation and destruction through the
/// embedder instead of the engine's own operating-system calls.
pub trait SocketFactory {
    /// Open a socket toward `addr`. `None` means the open failed, which
    /// aborts the affected transfer (and only that transfer).
    fn open(&self, kind: SocketKind, addr: &SocketAddr) -> Option<RawFd>;

    /// Close a previously opened socket, reporting success.
    fn close(&self, socket: RawFd) -> bool;
}
