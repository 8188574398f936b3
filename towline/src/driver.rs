//! The reactor adapter between the embedder's event loop and the transfer
//! engine.
//!
//! `TransferDriver` owns the registry of running connections, feeds
//! readiness and timeout events into the engine, services the engine's
//! socket-watch and timer requests against the external capabilities, and
//! drains completions after every event. It performs no threading and never
//! blocks: all entry points must be invoked from the single thread driving
//! the event loop that owns the [`Timer`] and [`SocketWatcher`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::connection::Connection;
use crate::engine::{
    Completion, DriverCtx, EngineEvent, SocketRequest, TransferEngine, TransferId, TransferIo,
};
use crate::event::{Interest, SocketWatcher, Timer};
use crate::metrics;

/// Drives registered connections' transfers over the embedder's event loop.
///
/// Cheap to clone; all clones share one single-threaded driver. The driver
/// retains each connection from [`start`](TransferDriver::start) until it
/// finishes or is [`abort`](TransferDriver::abort)ed, and releases its
/// reference exactly when the registry entry is removed.
pub struct TransferDriver<E: TransferEngine> {
    shared: Rc<DriverShared<E>>,
}

impl<E: TransferEngine> Clone for TransferDriver<E> {
    fn clone(&self) -> Self {
        TransferDriver {
            shared: self.shared.clone(),
        }
    }
}

struct DriverShared<E: TransferEngine> {
    self_ref: Weak<DriverShared<E>>,
    timer: Rc<dyn Timer>,
    watcher: Rc<dyn SocketWatcher>,
    state: RefCell<DriverState<E>>,
}

struct DriverState<E> {
    engine: E,
    /// Running connections, keyed by engine handle. A connection appears
    /// here if and only if its lifecycle is Running.
    running: HashMap<TransferId, Rc<Connection>>,
    /// Active socket watches. Presence of an entry is what marks a socket
    /// as already known to this driver.
    watches: HashMap<RawFd, Interest>,
    /// Bumped on every timer reschedule; expiries carrying a stale epoch
    /// are dropped.
    timer_epoch: u64,
}

impl<E: TransferEngine + 'static> TransferDriver<E> {
    /// Create a driver over `engine`, watching sockets and scheduling
    /// deadlines through the supplied capabilities.
    pub fn new(engine: E, watcher: Rc<dyn SocketWatcher>, timer: Rc<dyn Timer>) -> Self {
        let shared = Rc::new_cyclic(|weak| DriverShared {
            self_ref: weak.clone(),
            timer,
            watcher,
            state: RefCell::new(DriverState {
                engine,
                running: HashMap::new(),
                watches: HashMap::new(),
                timer_epoch: 0,
            }),
        });
        TransferDriver { shared }
    }

    /// Start running the connection's transfer.
    ///
    /// The driver retains the connection until it finishes or is aborted.
    /// Starting an already running connection changes nothing; starting a
    /// finished one is a fresh run. Registration may synchronously trigger
    /// the engine's socket and timer requests.
    pub fn start(&self, connection: &Rc<Connection>) {
        let state = &mut *self.shared.state.borrow_mut();
        if let Some(id) = connection.id() {
            if state.running.contains_key(&id) {
                debug!(id = id.0, "start of a running connection ignored");
                return;
            }
        }

        connection.will_start();

        let options = connection.options_snapshot();
        let io: Rc<dyn TransferIo> = connection.clone();
        let DriverState {
            engine,
            watches,
            timer_epoch,
            running,
        } = state;
        let mut ctx = ReactorCtx {
            shared: &self.shared,
            watches,
            timer_epoch,
        };
        let id = engine.register(options, io, &mut ctx);
        connection.set_id(Some(id));
        running.insert(id, connection.clone());
        metrics::TRANSFERS_STARTED.increment();
        debug!(id = id.0, "connection started");
    }

    /// Abort the running connection.
    ///
    /// The finish callback is never invoked for an aborted run; the
    /// connection reverts to not-running with no recorded result. Aborting
    /// a connection that is not running changes nothing.
    pub fn abort(&self, connection: &Rc<Connection>) {
        let state = &mut *self.shared.state.borrow_mut();
        let entry = connection.id().and_then(|id| state.running.remove(&id).map(|_| id));
        let Some(id) = entry else {
            debug!("abort of a not running connection ignored");
            return;
        };

        let DriverState {
            engine,
            watches,
            timer_epoch,
            ..
        } = state;
        let mut ctx = ReactorCtx {
            shared: &self.shared,
            watches,
            timer_epoch,
        };
        engine.unregister(id, &mut ctx);
        connection.set_id(None);
        connection.revert_idle();
        metrics::TRANSFERS_ABORTED.increment();
        debug!(id = id.0, "connection aborted");
    }
}

impl<E: TransferEngine + 'static> DriverShared<E> {
    /// Timer expiry notification. `epoch` identifies the arm that fired;
    /// an expiry already in flight when its arm was cancelled or replaced
    /// carries a stale epoch and is dropped here.
    fn timer_expired(self: &Rc<Self>, epoch: u64) {
        if self.state.borrow().timer_epoch != epoch {
            trace!(epoch, "stale timer expiry ignored");
            return;
        }
        debug!("timer expired");
        self.dispatch(EngineEvent::TimerExpired);
    }

    /// Socket readiness notification from the watcher. Readiness for a
    /// socket this driver is not watching is ignored.
    fn socket_ready(self: &Rc<Self>, socket: RawFd, readiness: Interest) {
        if !self.state.borrow().watches.contains_key(&socket) {
            debug!(socket, "readiness for an unwatched socket ignored");
            return;
        }
        trace!(socket, ?readiness, "socket ready");
        self.dispatch(EngineEvent::SocketReady { socket, readiness });
    }

    /// Feed one event into the engine, then drain completions.
    fn dispatch(self: &Rc<Self>, event: EngineEvent) {
        {
            let state = &mut *self.state.borrow_mut();
            let DriverState {
                engine,
                watches,
                timer_epoch,
                ..
            } = state;
            let mut ctx = ReactorCtx {
                shared: self,
                watches,
                timer_epoch,
            };
            engine.advance(event, &mut ctx);
        }
        self.drain_finished();
    }

    /// Pop completed transfers until the engine reports none remain, since
    /// a single event can complete several. Each completed connection is
    /// removed from the registry before its finish callback runs, so the
    /// callback can start it again as a fresh run. No internal borrow is
    /// held while the callback executes.
    fn drain_finished(self: &Rc<Self>) {
        loop {
            let finished = {
                let state = &mut *self.state.borrow_mut();
                match state.engine.next_completion() {
                    None => break,
                    Some(Completion { id, result }) => {
                        state.running.remove(&id).map(|conn| (conn, result))
                    }
                }
            };
            // Absent from the registry: already removed by a more specific
            // path (abort), so the notification is suppressed.
            let Some((connection, result)) = finished else {
                continue;
            };
            connection.set_id(None);
            metrics::TRANSFERS_FINISHED.increment();
            debug!(result = ?result, "connection finished");
            connection.did_finish(result);
        }
    }
}

impl<E: TransferEngine> Drop for DriverShared<E> {
    fn drop(&mut self) {
        // Dropping the last driver handle abandons running transfers:
        // no finish callbacks, pending timer stopped, watches released.
        self.timer.stop();
        let state = self.state.get_mut();
        for socket in state.watches.keys() {
            self.watcher.stop_watching(*socket);
        }
        for connection in state.running.values() {
            connection.set_id(None);
            connection.revert_idle();
        }
    }
}

/// [`DriverCtx`] handed to the engine: services its socket and timer
/// requests against the external capabilities and the driver's bookkeeping.
struct ReactorCtx<'a, E: TransferEngine> {
    shared: &'a Rc<DriverShared<E>>,
    watches: &'a mut HashMap<RawFd, Interest>,
    timer_epoch: &'a mut u64,
}

impl<E: TransferEngine + 'static> DriverCtx for ReactorCtx<'_, E> {
    fn reschedule_timeout(&mut self, timeout: Option<Duration>) {
        // Cancel-and-replace: there is never more than one pending
        // deadline, and a replaced arm's in-flight expiry must not fire.
        self.shared.timer.stop();
        *self.timer_epoch += 1;
        let Some(timeout) = timeout else {
            debug!("timer cleared");
            return;
        };

        let epoch = *self.timer_epoch;
        let weak = self.shared.self_ref.clone();
        debug!(?timeout, "timer armed");
        metrics::TIMER_ARMS.increment();
        self.shared.timer.start(
            timeout,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.timer_expired(epoch);
                }
            }),
        );
    }

    fn update_socket(&mut self, socket: RawFd, request: SocketRequest) {
        // A socket is known exactly when it has a bookkeeping entry. A
        // first-sight socket must never reach stop_watching, even when the
        // engine's first request for it is a removal.
        if self.watches.remove(&socket).is_some() {
            debug!(socket, "stop watching socket");
            self.shared.watcher.stop_watching(socket);
            metrics::SOCKETS_UNWATCHED.increment();
        }

        let SocketRequest::Watch(interest) = request else {
            debug!(socket, "socket removed");
            return;
        };

        debug!(socket, ?interest, "watch socket");
        let weak = self.shared.self_ref.clone();
        self.shared.watcher.watch(
            socket,
            interest,
            Box::new(move |socket, readiness| {
                if let Some(shared) = weak.upgrade() {
                    shared.socket_ready(socket, readiness);
                }
            }),
        );
        self.watches.insert(socket, interest);
        metrics::SOCKETS_WATCHED.increment();
    }
}
