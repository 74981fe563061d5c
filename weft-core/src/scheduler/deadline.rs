//! Time budgets handed to the work loop.

use std::time::{Duration, Instant};

/// Remaining time in the current idle period.
pub trait Deadline {
    /// Milliseconds left before the engine should yield back to the host.
    fn time_remaining_ms(&self) -> f64;
}

impl<F> Deadline for F
where
    F: Fn() -> f64,
{
    fn time_remaining_ms(&self) -> f64 {
        self()
    }
}

/// A deadline that always reports the same budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDeadline(f64);

impl FixedDeadline {
    pub fn new(remaining_ms: f64) -> Self {
        Self(remaining_ms)
    }

    /// A deadline that never runs out.
    pub fn unbounded() -> Self {
        Self(f64::INFINITY)
    }

    /// A deadline that has already run out.
    pub fn expired() -> Self {
        Self(0.0)
    }
}

impl Deadline for FixedDeadline {
    fn time_remaining_ms(&self) -> f64 {
        self.0
    }
}

/// A wall-clock deadline.
#[derive(Debug, Clone, Copy)]
pub struct InstantDeadline {
    end: Instant,
}

impl InstantDeadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            end: Instant::now() + budget,
        }
    }

    pub fn at(end: Instant) -> Self {
        Self { end }
    }
}

impl Deadline for InstantDeadline {
    fn time_remaining_ms(&self) -> f64 {
        self.end
            .saturating_duration_since(Instant::now())
            .as_secs_f64()
            * 1000.0
    }
}
