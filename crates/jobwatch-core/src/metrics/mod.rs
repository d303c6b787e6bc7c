//! Prometheus textfile metrics
//!
//! Jobs record a `<job>_completed <unix_seconds>` line in `<job>.prom` under
//! the scraped directory once they finish.

mod emitter;

pub use emitter::MetricEmitter;
