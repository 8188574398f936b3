//! towline — reactor glue for driving many concurrent transfers over an
//! embedder-supplied event loop.
//!
//! The protocol work (connect, TLS, wire formats) lives in an external
//! [`TransferEngine`]; towline is the adapter around it. It translates the
//! engine's level-triggered "watch this socket" / "wake me at time T"
//! requests into calls on the embedder's [`Timer`] and [`SocketWatcher`]
//! capabilities, feeds readiness notifications back in, and reports each
//! transfer's completion exactly once — all single-threaded, non-blocking,
//! from the thread driving the event loop.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use towline::{Connection, TransferDriver};
//!
//! // `engine`, `watcher` and `timer` are supplied by the embedder.
//! let driver = TransferDriver::new(engine, watcher, timer);
//!
//! let conn = Connection::new();
//! conn.set_url("https://example.com/");
//! conn.on_finished(|conn| println!("done: {:?}", conn.result()));
//!
//! driver.start(&conn);
//! // ... run the event loop; the finish callback fires from within it ...
//! ```
//!
//! Aborting is the one way to stop a running transfer without a result:
//! [`TransferDriver::abort`] never invokes the finish callback.

// ── Internal modules ────────────────────────────────────────────────────
pub(crate) mod metrics;

// ── Public modules ──────────────────────────────────────────────────────
pub mod config;
pub mod connection;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;

// ── Re-exports: configuration ───────────────────────────────────────────

/// Low-speed abort threshold.
pub use config::LowSpeedLimit;
/// Credentials for an authenticated proxy.
pub use config::ProxyCredentials;
/// Per-transfer configuration snapshot.
pub use config::TransferOptions;

// ── Re-exports: connection ──────────────────────────────────────────────

/// One transfer's configuration, run state and result.
pub use connection::Connection;
/// Where a connection is in its life.
pub use connection::Lifecycle;

// ── Re-exports: driver ──────────────────────────────────────────────────

/// The reactor adapter driving transfers over the event loop.
pub use driver::TransferDriver;

// ── Re-exports: engine interface ────────────────────────────────────────

/// One completed transfer popped from the engine.
pub use engine::Completion;
/// Reactor services the engine calls back into.
pub use engine::DriverCtx;
/// Readiness event fed into the engine.
pub use engine::EngineEvent;
/// Transfer progress snapshot.
pub use engine::Progress;
/// Engine request for one socket's watch state.
pub use engine::SocketRequest;
/// The external transfer engine.
pub use engine::TransferEngine;
/// Engine-assigned identity of one registered transfer.
pub use engine::TransferId;
/// Byte-level glue the engine drives during a transfer.
pub use engine::TransferIo;

// ── Re-exports: errors ──────────────────────────────────────────────────

/// Per-transfer failure kinds.
pub use error::TransferError;
/// Outcome of one finished transfer.
pub use error::TransferResult;

// ── Re-exports: event-loop capabilities ─────────────────────────────────

/// Timer expiry callback.
pub use event::ExpireFn;
/// Directions of interest for a socket watch.
pub use event::Interest;
/// Socket readiness callback.
pub use event::ReadyFn;
/// Socket factory capability.
pub use event::SocketFactory;
/// Socket kind requested through a factory.
pub use event::SocketKind;
/// Level-triggered socket readiness capability.
pub use event::SocketWatcher;
/// One-shot countdown timer capability.
pub use event::Timer;
