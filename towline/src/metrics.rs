//! towline driver metrics.
//!
//! Counters for transfer lifecycle and reactor bookkeeping. Exposed through
//! the global metriken registry.

use metriken::{metric, Counter};

#[metric(
    name = "towline/transfers/started",
    description = "Transfers handed to the engine"
)]
pub static TRANSFERS_STARTED: Counter = Counter::new();

#[metric(
    name = "towline/transfers/finished",
    description = "Transfers completed by the engine"
)]
pub static TRANSFERS_FINISHED: Counter = Counter::new();

#[metric(
    name = "towline/transfers/aborted",
    description = "Transfers removed before completion"
)]
pub static TRANSFERS_ABORTED: Counter = Counter::new();

#[metric(
    name = "towline/sockets/watched",
    description = "Socket watches established"
)]
pub static SOCKETS_WATCHED: Counter = Counter::new();

#[metric(
    name = "towline/sockets/unwatched",
    description = "Socket watches stopped"
)]
pub static SOCKETS_UNWATCHED: Counter = Counter::new();

#[metric(
    name = "towline/timer/arms",
    description = "Timer arms requested by the engine"
)]
pub static TIMER_ARMS: Counter = Counter::new();
