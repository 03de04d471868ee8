//! The contract every guard in this crate implements.

/// A counter whose increment is meant to happen at most once.
///
/// [`attempt`](OnceCounter::attempt) is the effect-triggering operation; how strongly the
/// "at most once" part holds under concurrency is up to the implementation.
pub trait OnceCounter: Send + Sync {
   /// Human readable name used in reports, e.g. `Synced` in `"Synced value: 1"`.
   const LABEL: &'static str;

   /// Increments the counter unless the guard considers the work already done.
   fn attempt(&self);

   /// Current counter value.
   fn value(&self) -> u64;
}
