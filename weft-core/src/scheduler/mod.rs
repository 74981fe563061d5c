//! Scheduler
//!
//! Reconciliation runs in small slices during host idle time instead of one
//! blocking pass.
//!
//! # How It Works
//!
//! 1. [`Engine::render`] creates a work-in-progress root whose only child is
//!    the rendered element, and points the next unit of work at it.
//!
//! 2. Each idle period, [`Engine::work_loop`] processes fibers one at a time
//!    in pre-order, checking the [`Deadline`] before every unit after the
//!    first. A unit is never split, so the only suspension points are
//!    between fibers.
//!
//! 3. When no unit is left, the same tick commits the finished tree.
//!
//! 4. [`Runtime`] re-requests idle time after every tick, forever, whether or
//!    not there was anything to do.
//!
//! A render issued while a pass is still running replaces it. The abandoned
//! tree was never committed, so the host tree is unaffected.

mod deadline;
mod engine;
mod runtime;

pub use deadline::{Deadline, FixedDeadline, InstantDeadline};
pub use engine::{Engine, TickOutcome};
pub use runtime::{IdleCallback, IdleHost, ManualIdleHost, Runtime, RuntimeStats};
