//! Property tests: fuzzed delivery orders, duplication and schedules.

mod idempotence;
mod monotonic;
mod safety;
mod tie_break;
