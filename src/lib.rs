//! Three ways to make a piece of work run at most once under concurrent callers.
//!
//! Each guard owns a counter and increments it "once":
//!
//! - [`UnguardedOnce`]: a plain flag check followed by the increment. Concurrent callers
//!   race past the check, so the counter can end up well above one.
//! - [`LockedOnce`]: the same check-then-act, serialized by a mutex stored next to the
//!   counter. Exactly one increment.
//! - [`BuiltinOnce`]: delegates to [`RunOnce`], a dedicated run-once primitive. Exactly
//!   one increment, and callers arriving after it pay a single atomic load.
//!
//! [`RunOnce`] is a small state machine (not run, running, done) packed into one atomic
//! byte. Callers that lose the race park through `parking_lot_core` until the winner
//! publishes completion instead of spinning.
//!
//! The [`driver`] module spawns many concurrent attempts against a guard, joins them
//! all, and reports the final counter.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use once_guards::{driver, BuiltinOnce, LockedOnce};
//!
//! let locked = Arc::new(LockedOnce::new());
//! let report = driver::hammer(&locked, 10).unwrap();
//! assert_eq!(report.to_string(), "Manually synced value: 1");
//!
//! let synced = Arc::new(BuiltinOnce::new());
//! assert_eq!(driver::hammer(&synced, 10).unwrap().value, 1);
//! ```
//!
//! ```rust
//! use once_guards::RunOnce;
//!
//! static SETUP: RunOnce = RunOnce::new();
//!
//! assert!(SETUP.call_once(|| println!("first")));
//! assert!(!SETUP.call_once(|| unreachable!()));
//! ```

/// The common "increment at most once" contract.
mod counter;

/// Driver errors.
mod error;

/// Internal run-once state machine.
mod state;

/// Dedicated run-once primitive.
mod run_once;

/// Guard without synchronization.
mod unguarded;

/// Mutex-based guard.
mod locked;

/// Guard backed by `RunOnce`.
mod builtin;

pub mod driver;

pub use builtin::BuiltinOnce;
pub use counter::OnceCounter;
pub use error::DriverError;
pub use locked::LockedOnce;
pub use run_once::RunOnce;
pub use unguarded::UnguardedOnce;
