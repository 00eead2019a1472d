//! Feature-gated event logging for the queue.
//!
//! With `--features tracing` the queue reports construction and each step of
//! the close protocol at `debug`, and consumer suspension and close-time
//! wakeup broadcasts at `trace`. Without the feature `debug!`/`trace!`
//! expand to nothing and their arguments are never evaluated.

/// Installs a `tracing` subscriber that prints queue events to stdout.
///
/// Filtering comes from `RUST_LOG` when set, otherwise `nexus_pq=debug`.
/// Lines carry the thread id and name plus time since startup, which is what
/// matters when reading an interleaving of producers, consumers and a
/// closer. Later calls are ignored if a global subscriber already exists.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nexus_pq=debug"));

    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry().with(layer).with(filter).try_init();
}

/// Does nothing: built without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use discard as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use discard as trace;
