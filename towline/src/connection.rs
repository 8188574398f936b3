//! One transfer: configuration, mutable run state, result, and the
//! privileged lifecycle hooks the driver uses to drive it.
//!
//! A `Connection` is shared between the caller (which configures it and
//! reads results) and the [`TransferDriver`](crate::TransferDriver), which
//! holds its own clone only while the transfer is running. Configure with
//! the setters, register a finish callback, hand it to
//! [`TransferDriver::start`](crate::TransferDriver::start), and read the
//! getters once it finishes. Not thread safe.

use std::cell::{Cell, RefCell};
use std::io::SeekFrom;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::config::{LowSpeedLimit, ProxyCredentials, TransferOptions};
use crate::engine::{Progress, TransferId, TransferIo};
use crate::error::TransferResult;
use crate::event::SocketFactory;

/// Where a connection is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, or aborted out of a run. No result is recorded.
    Idle,
    /// Registered with a driver and owned by it until completion or abort.
    Running,
    /// Completed with a recorded result.
    Finished,
}

/// Callback for reading request-body bytes into `buf`. Returning `None`
/// aborts the transfer; `Some(0)` means the body is exhausted.
pub type ReadBodyFn = dyn Fn(&Rc<Connection>, &mut [u8]) -> Option<usize>;

/// Callback for repositioning the request-body cursor when re-sending.
pub type SeekBodyFn = dyn Fn(&Rc<Connection>, SeekFrom) -> bool;

/// Callback receiving response header or body chunks. Returning `false`
/// aborts the transfer.
pub type WriteFn = dyn Fn(&Rc<Connection>, &[u8]) -> bool;

/// Progress-meter callback. Returning `false` aborts the transfer.
pub type ProgressFn = dyn Fn(&Rc<Connection>, Progress) -> bool;

/// Callback invoked exactly once per run when the transfer finishes.
pub type FinishedFn = dyn Fn(&Rc<Connection>);

#[derive(Default)]
struct Callbacks {
    read_body: Option<Rc<ReadBodyFn>>,
    seek_body: Option<Rc<SeekBodyFn>>,
    write_header: Option<Rc<WriteFn>>,
    write_body: Option<Rc<WriteFn>>,
    progress: Option<Rc<ProgressFn>>,
    finished: Option<Rc<FinishedFn>>,
}

/// Per-run mutable state, reset by `will_start`.
#[derive(Default)]
struct RunState {
    body_cursor: usize,
    response_header: BytesMut,
    response_body: BytesMut,
    result: Option<TransferResult>,
}

/// One transfer's configuration, run state and result.
pub struct Connection {
    self_ref: Weak<Connection>,
    options: RefCell<TransferOptions>,
    callbacks: RefCell<Callbacks>,
    run: RefCell<RunState>,
    lifecycle: Cell<Lifecycle>,
    id: Cell<Option<TransferId>>,
    socket_factory: RefCell<Option<Rc<dyn SocketFactory>>>,
}

impl Connection {
    /// Create an idle connection with default options.
    pub fn new() -> Rc<Connection> {
        Rc::new_cyclic(|weak| Connection {
            self_ref: weak.clone(),
            options: RefCell::new(TransferOptions::default()),
            callbacks: RefCell::new(Callbacks::default()),
            run: RefCell::new(RunState::default()),
            lifecycle: Cell::new(Lifecycle::Idle),
            id: Cell::new(None),
            socket_factory: RefCell::new(None),
        })
    }

    // ── Configuration ───────────────────────────────────────────────

    /// Set the URL used for the transfer.
    pub fn set_url(&self, url: impl Into<String>) {
        self.options.borrow_mut().url = url.into();
    }

    /// Ask the engine to emit detail about the transfer.
    pub fn set_verbose(&self, verbose: bool) {
        self.options.borrow_mut().verbose = verbose;
    }

    /// Set the proxy used for the transfer.
    pub fn set_proxy(&self, proxy: impl Into<String>) {
        self.options.borrow_mut().proxy = Some(proxy.into());
    }

    /// Set the authenticated account for the proxy.
    pub fn set_proxy_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        self.options.borrow_mut().proxy_credentials = Some(ProxyCredentials {
            username: username.into(),
            password: password.into(),
        });
    }

    /// Connect to the peer only, transferring no data.
    pub fn set_connect_only(&self, connect_only: bool) {
        self.options.borrow_mut().connect_only = connect_only;
    }

    /// Verify the peer's TLS certificate. Default true.
    pub fn set_verify_certificate(&self, verify: bool) {
        self.options.borrow_mut().verify_certificate = verify;
    }

    /// Verify the certificate's name against the host. Default true.
    pub fn set_verify_host(&self, verify: bool) {
        self.options.borrow_mut().verify_host = verify;
    }

    /// Set the file holding certificates to verify the peer with.
    pub fn set_ca_file(&self, path: impl Into<PathBuf>) {
        self.options.borrow_mut().ca_file = Some(path.into());
    }

    /// Set the request body for the default in-memory body source. Ignored
    /// once a read-body callback is set.
    pub fn set_request_body(&self, body: impl Into<Bytes>) {
        self.options.borrow_mut().request_body = body.into();
    }

    /// Whether a response body is expected. Must be set to false for
    /// responses without a body, otherwise the transfer stalls. Default
    /// true.
    pub fn set_receive_body(&self, receive_body: bool) {
        self.options.borrow_mut().receive_body = receive_body;
    }

    /// Enable the progress meter. When disabled the progress callback is
    /// never invoked. Default false.
    pub fn set_enable_progress(&self, enable: bool) {
        self.options.borrow_mut().enable_progress = enable;
    }

    /// Timeout for the connect phase. `None` selects the engine default.
    pub fn set_connect_timeout(&self, timeout: Option<Duration>) {
        self.options.borrow_mut().connect_timeout = timeout;
    }

    /// Timeout for the whole transfer. `None` means no timeout.
    pub fn set_total_timeout(&self, timeout: Option<Duration>) {
        self.options.borrow_mut().total_timeout = timeout;
    }

    /// Fail the transfer when the average speed stays below
    /// `bytes_per_sec` for `duration`. `None` removes the threshold.
    pub fn set_low_speed_timeout(&self, limit: Option<LowSpeedLimit>) {
        self.options.borrow_mut().low_speed_limit = limit;
    }

    /// Fail the transfer after `duration` of idleness. Shortcut for a
    /// low-speed threshold of one byte per second.
    pub fn set_idle_timeout(&self, duration: Option<Duration>) {
        self.set_low_speed_timeout(duration.map(|duration| LowSpeedLimit {
            bytes_per_sec: 1,
            duration,
        }));
    }

    /// Route socket creation and destruction through `factory` instead of
    /// the engine's own operating-system calls.
    pub fn set_socket_factory(&self, factory: Rc<dyn SocketFactory>) {
        *self.socket_factory.borrow_mut() = Some(factory);
    }

    /// Mutate option fields without a dedicated setter (protocol-specific
    /// options such as request header lines).
    pub fn update_options(&self, f: impl FnOnce(&mut TransferOptions)) {
        f(&mut self.options.borrow_mut());
    }

    // ── Data callbacks ──────────────────────────────────────────────

    /// Supply request-body bytes instead of the default in-memory source.
    pub fn on_read_body(&self, f: impl Fn(&Rc<Connection>, &mut [u8]) -> Option<usize> + 'static) {
        self.callbacks.borrow_mut().read_body = Some(Rc::new(f));
    }

    /// Reposition the custom body source when the engine re-sends. Should
    /// be provided along with a read-body callback; without it, seeks on a
    /// custom source fail.
    pub fn on_seek_body(&self, f: impl Fn(&Rc<Connection>, SeekFrom) -> bool + 'static) {
        self.callbacks.borrow_mut().seek_body = Some(Rc::new(f));
    }

    /// Receive response header chunks instead of the default accumulation.
    pub fn on_write_header(&self, f: impl Fn(&Rc<Connection>, &[u8]) -> bool + 'static) {
        self.callbacks.borrow_mut().write_header = Some(Rc::new(f));
    }

    /// Receive response body chunks instead of the default accumulation.
    pub fn on_write_body(&self, f: impl Fn(&Rc<Connection>, &[u8]) -> bool + 'static) {
        self.callbacks.borrow_mut().write_body = Some(Rc::new(f));
    }

    /// Receive progress updates. Only invoked when the progress meter is
    /// enabled.
    pub fn on_progress(&self, f: impl Fn(&Rc<Connection>, Progress) -> bool + 'static) {
        self.callbacks.borrow_mut().progress = Some(Rc::new(f));
    }

    /// Get informed when the transfer finishes. Invoked exactly once per
    /// run; never invoked for an aborted run.
    pub fn on_finished(&self, f: impl Fn(&Rc<Connection>) + 'static) {
        self.callbacks.borrow_mut().finished = Some(Rc::new(f));
    }

    // ── Results ─────────────────────────────────────────────────────

    /// The recorded result. `None` until the transfer finishes.
    pub fn result(&self) -> Option<TransferResult> {
        self.run.borrow().result
    }

    /// Accumulated response header bytes. Empty when a write-header
    /// callback is set; content undefined before the transfer finishes.
    pub fn response_header(&self) -> Bytes {
        self.run.borrow().response_header.clone().freeze()
    }

    /// Accumulated response body bytes. Empty when a write-body callback is
    /// set; content undefined before the transfer finishes.
    pub fn response_body(&self) -> Bytes {
        self.run.borrow().response_body.clone().freeze()
    }

    /// Where the connection is in its life.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    // ── Driver hooks ────────────────────────────────────────────────

    /// Reset all per-run state and mark the connection running. Callable
    /// any number of times; always resets cleanly.
    pub(crate) fn will_start(&self) {
        let mut run = self.run.borrow_mut();
        run.body_cursor = 0;
        run.response_header.clear();
        run.response_body.clear();
        run.result = None;
        drop(run);
        self.lifecycle.set(Lifecycle::Running);
    }

    /// Record the result, mark the connection finished and invoke the
    /// finish callback. The driver calls this at most once per run, after
    /// removing the connection from its registry.
    pub(crate) fn did_finish(self: &Rc<Self>, result: TransferResult) {
        self.run.borrow_mut().result = Some(result);
        self.lifecycle.set(Lifecycle::Finished);
        let finished = self.callbacks.borrow().finished.clone();
        if let Some(finished) = finished {
            finished(self);
        }
    }

    /// Revert to not-running without recording a result (abort path).
    pub(crate) fn revert_idle(&self) {
        self.lifecycle.set(Lifecycle::Idle);
    }

    pub(crate) fn id(&self) -> Option<TransferId> {
        self.id.get()
    }

    pub(crate) fn set_id(&self, id: Option<TransferId>) {
        self.id.set(id);
    }

    /// Clone of the current options, taken when the driver registers the
    /// transfer with the engine.
    pub(crate) fn options_snapshot(&self) -> TransferOptions {
        self.options.borrow().clone()
    }

    fn strong(&self) -> Option<Rc<Connection>> {
        self.self_ref.upgrade()
    }
}

impl TransferIo for Connection {
    fn read_body(&self, buf: &mut [u8]) -> Option<usize> {
        let read_body = self.callbacks.borrow().read_body.clone();
        if let Some(read_body) = read_body {
            let conn = self.strong()?;
            return read_body(&conn, buf);
        }

        let options = self.options.borrow();
        let mut run = self.run.borrow_mut();
        let body = &options.request_body;
        let remaining = body.len().saturating_sub(run.body_cursor);
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&body[run.body_cursor..run.body_cursor + n]);
        run.body_cursor += n;
        trace!(bytes = n, "read body");
        Some(n)
    }

    fn seek_body(&self, pos: SeekFrom) -> bool {
        let callbacks = self.callbacks.borrow();
        if callbacks.read_body.is_some() {
            let seek_body = callbacks.seek_body.clone();
            drop(callbacks);
            let Some(seek_body) = seek_body else {
                return false;
            };
            let Some(conn) = self.strong() else {
                return false;
            };
            return seek_body(&conn, pos);
        }
        drop(callbacks);

        let len = self.options.borrow().request_body.len() as i128;
        let mut run = self.run.borrow_mut();
        let target: i128 = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => run.body_cursor as i128 + offset as i128,
            SeekFrom::End(offset) => len + offset as i128,
        };
        if target < 0 || target > len {
            trace!(?pos, "seek body rejected");
            return false;
        }
        run.body_cursor = target as usize;
        trace!(cursor = run.body_cursor, "seek body");
        true
    }

    fn write_header(&self, data: &[u8]) -> bool {
        let write_header = self.callbacks.borrow().write_header.clone();
        match write_header {
            Some(write_header) => match self.strong() {
                Some(conn) => write_header(&conn, data),
                None => false,
            },
            None => {
                self.run.borrow_mut().response_header.extend_from_slice(data);
                true
            }
        }
    }

    fn write_body(&self, data: &[u8]) -> bool {
        let write_body = self.callbacks.borrow().write_body.clone();
        match write_body {
            Some(write_body) => match self.strong() {
                Some(conn) => write_body(&conn, data),
                None => false,
            },
            None => {
                self.run.borrow_mut().response_body.extend_from_slice(data);
                true
            }
        }
    }

    fn progress(&self, progress: Progress) -> bool {
        let callback = self.callbacks.borrow().progress.clone();
        match callback {
            Some(callback) => match self.strong() {
                Some(conn) => callback(&conn, progress),
                None => false,
            },
            None => true,
        }
    }

    fn socket_factory(&self) -> Option<Rc<dyn SocketFactory>> {
        self.socket_factory.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn read_all(conn: &Connection, chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = conn.read_body(&mut buf).expect("default source never fails");
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn default_body_source_reads_in_chunks() {
        let conn = Connection::new();
        conn.set_request_body(&b"hello world"[..]);
        conn.will_start();
        assert_eq!(read_all(&conn, 4), b"hello world");
        // Exhausted source keeps returning zero.
        let mut buf = [0u8; 4];
        assert_eq!(conn.read_body(&mut buf), Some(0));
    }

    #[test]
    fn default_body_source_seeks_from_all_origins() {
        let conn = Connection::new();
        conn.set_request_body(&b"0123456789"[..]);
        conn.will_start();

        assert!(conn.seek_body(SeekFrom::Start(4)));
        assert_eq!(read_all(&conn, 16), b"456789");

        assert!(conn.seek_body(SeekFrom::End(-3)));
        assert_eq!(read_all(&conn, 16), b"789");

        assert!(conn.seek_body(SeekFrom::Start(2)));
        assert!(conn.seek_body(SeekFrom::Current(3)));
        assert_eq!(read_all(&conn, 16), b"56789");
    }

    #[test]
    fn out_of_range_seeks_are_rejected() {
        let conn = Connection::new();
        conn.set_request_body(&b"abc"[..]);
        conn.will_start();

        assert!(!conn.seek_body(SeekFrom::Start(4)));
        assert!(!conn.seek_body(SeekFrom::End(1)));
        assert!(!conn.seek_body(SeekFrom::Current(-1)));
        // A rejected seek leaves the cursor where it was.
        assert_eq!(read_all(&conn, 16), b"abc");
        // Seeking exactly to the end is allowed.
        assert!(conn.seek_body(SeekFrom::End(0)));
    }

    #[test]
    fn custom_source_without_seek_callback_fails_seeks() {
        let conn = Connection::new();
        conn.on_read_body(|_, _| Some(0));
        conn.will_start();
        assert!(!conn.seek_body(SeekFrom::Start(0)));

        conn.on_seek_body(|_, pos| pos == SeekFrom::Start(0));
        assert!(conn.seek_body(SeekFrom::Start(0)));
        assert!(!conn.seek_body(SeekFrom::Start(1)));
    }

    #[test]
    fn default_sinks_accumulate() {
        let conn = Connection::new();
        conn.will_start();
        assert!(conn.write_header(b"HTTP/1.1 200 OK\r\n"));
        assert!(conn.write_header(b"\r\n"));
        assert!(conn.write_body(b"hello"));
        assert!(conn.write_body(b" there"));
        assert_eq!(&conn.response_header()[..], b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(&conn.response_body()[..], b"hello there");
    }

    #[test]
    fn custom_sinks_bypass_buffers() {
        let conn = Connection::new();
        let seen = Rc::new(Cell::new(0usize));
        let counter = seen.clone();
        conn.on_write_body(move |_, data| {
            counter.set(counter.get() + data.len());
            true
        });
        conn.will_start();
        assert!(conn.write_body(b"12345"));
        assert_eq!(seen.get(), 5);
        assert!(conn.response_body().is_empty());
    }

    #[test]
    fn will_start_resets_per_run_state() {
        let conn = Connection::new();
        conn.set_request_body(&b"body"[..]);
        conn.will_start();
        let mut buf = [0u8; 16];
        conn.read_body(&mut buf).unwrap();
        conn.write_body(b"stale");
        conn.did_finish(Ok(()));
        assert_eq!(conn.result(), Some(Ok(())));
        assert_eq!(conn.lifecycle(), Lifecycle::Finished);

        conn.will_start();
        assert_eq!(conn.lifecycle(), Lifecycle::Running);
        assert_eq!(conn.result(), None);
        assert!(conn.response_body().is_empty());
        assert_eq!(read_all(&conn, 16), b"body");
    }

    #[test]
    fn finish_records_result_without_callback() {
        let conn = Connection::new();
        conn.will_start();
        conn.did_finish(Err(crate::TransferError::TimedOut));
        assert_eq!(conn.result(), Some(Err(crate::TransferError::TimedOut)));
    }

    #[test]
    fn finish_callback_receives_the_connection() {
        let conn = Connection::new();
        let fired = Rc::new(Cell::new(0u32));
        let counter = fired.clone();
        conn.on_finished(move |conn| {
            assert_eq!(conn.result(), Some(Ok(())));
            counter.set(counter.get() + 1);
        });
        conn.will_start();
        conn.did_finish(Ok(()));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn progress_defaults_to_continue() {
        let conn = Connection::new();
        conn.will_start();
        assert!(conn.progress(Progress::default()));
    }
}
