//! The transfer-engine abstraction.
//!
//! The engine owns the actual protocol state machines (connect, TLS, wire
//! protocol); the driver only feeds it readiness and timeout events and
//! services the socket/timer requests it issues in response. Completions
//! accumulate inside the engine and are popped one at a time through
//! [`TransferEngine::next_completion`].

use std::io::SeekFrom;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

use crate::config::TransferOptions;
use crate::error::TransferResult;
use crate::event::{Interest, SocketFactory};

/// Engine-assigned identity of one registered transfer.
///
/// Unique while the transfer is registered; the driver uses it as the
/// registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(pub u64);

/// Readiness event fed into the engine by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The pending deadline elapsed.
    TimerExpired,
    /// A watched socket became ready.
    SocketReady { socket: RawFd, readiness: Interest },
}

/// What the engine asks the reactor to do with one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketRequest {
    /// Establish (or redirect) a level-triggered watch.
    Watch(Interest),
    /// Drop any interest in the socket.
    Remove,
}

/// Reactor services available to the engine while the driver is inside one
/// of its calls.
///
/// Requests arrive synchronously from [`TransferEngine::register`],
/// [`TransferEngine::unregister`] or [`TransferEngine::advance`], any number
/// of times per call.
pub trait DriverCtx {
    /// Replace the single pending deadline. `None` leaves no timer pending.
    fn reschedule_timeout(&mut self, timeout: Option<Duration>);

    /// Update the watch state for `socket`.
    fn update_socket(&mut self, socket: RawFd, request: SocketRequest);
}

/// One completed transfer popped from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub id: TransferId,
    pub result: TransferResult,
}

/// Transfer progress snapshot passed to the progress callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total_download: u64,
    pub current_download: u64,
    pub total_upload: u64,
    pub current_upload: u64,
}

/// Byte-level glue the engine drives while a transfer runs.
///
/// Implemented by [`Connection`](crate::Connection). A `false` or `None`
/// return from any method aborts that transfer with
/// [`TransferError::AbortedByCallback`](crate::TransferError::AbortedByCallback).
pub trait TransferIo {
    /// Fill `buf` with request-body bytes, returning how many were written.
    /// `Some(0)` means the body is exhausted.
    fn read_body(&self, buf: &mut [u8]) -> Option<usize>;

    /// Reposition the request-body cursor (used when re-sending).
    fn seek_body(&self, pos: SeekFrom) -> bool;

    /// Deliver one chunk of response header data.
    fn write_header(&self, data: &[u8]) -> bool;

    /// Deliver one chunk of response body data.
    fn write_body(&self, data: &[u8]) -> bool;

    /// Report transfer progress. Only invoked when progress reporting is
    /// enabled in the transfer's options.
    fn progress(&self, progress: Progress) -> bool;

    /// The socket factory to route socket open/close through, if any.
    /// `None` means the engine performs the operating-system calls itself.
    fn socket_factory(&self) -> Option<Rc<dyn SocketFactory>>;
}

/// The external transfer engine.
///
/// Treated as opaque by the driver: it accepts events, issues reactor
/// requests through the [`DriverCtx`], and reports per-transfer completions.
/// All calls are made from the single thread driving the event loop.
pub trait TransferEngine {
    /// Register a transfer. Infallible by contract: a registration that
    /// cannot proceed surfaces later as that transfer's completion result.
    /// May synchronously issue requests through `ctx`.
    fn register(
        &mut self,
        options: TransferOptions,
        io: Rc<dyn TransferIo>,
        ctx: &mut dyn DriverCtx,
    ) -> TransferId;

    /// Remove a transfer before it completes. No completion is reported for
    /// it afterwards. May synchronously issue requests through `ctx`.
    fn unregister(&mut self, id: TransferId, ctx: &mut dyn DriverCtx);

    /// Advance the protocol state machines in response to `event`.
    fn advance(&mut self, event: EngineEvent, ctx: &mut dyn DriverCtx);

    /// Pop the next completed transfer, if any. The driver calls this
    /// repeatedly after every event until it returns `None`, because a
    /// single event can complete several transfers.
    fn next_completion(&mut self) -> Option<Completion>;
}
