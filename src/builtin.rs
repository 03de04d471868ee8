//! A run-once guard delegating to the dedicated [`RunOnce`] primitive.
//!
//! Same guarantee as [`LockedOnce`](crate::LockedOnce), but once the increment has
//! happened later callers pay for a single atomic load instead of a lock.

use core::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::counter::OnceCounter;
use crate::run_once::RunOnce;

/// Guard backed by [`RunOnce`]: the increment happens exactly once.
#[derive(Debug, Default)]
pub struct BuiltinOnce {
   value: AtomicU64,
   once: RunOnce,
}

impl BuiltinOnce {
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         value: AtomicU64::new(0),
         once: RunOnce::new(),
      }
   }

   /// Increments the counter unless some caller already did. Blocks only while
   /// another caller is in the middle of the increment.
   #[inline]
   pub fn attempt(&self) {
      self.attempt_with(|| {});
   }

   /// Like [`attempt`](Self::attempt), running `hook` inside the one-time effect right
   /// before the increment.
   #[inline]
   pub fn attempt_with<F>(&self, hook: F)
   where
      F: FnOnce(),
   {
      self.once.call_once(|| {
         hook();
         self.increment();
      });
   }

   /// Runs the increment only if nobody has run or is running it right now.
   ///
   /// Returns `true` if this call ran it.
   #[inline]
   pub fn try_attempt(&self) -> bool {
      self.once.call_once_nowait(|| self.increment())
   }

   /// Async [`attempt`](Self::attempt): yields rather than blocks while another task is
   /// running the increment.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[inline]
   pub async fn attempt_async(&self) {
      self
         .once
         .call_once_async(|| async { self.increment() })
         .await;
   }

   fn increment(&self) {
      let value = self.value.fetch_add(1, Ordering::Relaxed) + 1;
      debug!(label = Self::LABEL, value, "set synced value");
   }

   #[inline]
   pub fn is_done(&self) -> bool {
      self.once.is_completed()
   }

   #[inline]
   pub fn value(&self) -> u64 {
      self.value.load(Ordering::Relaxed)
   }
}

impl OnceCounter for BuiltinOnce {
   const LABEL: &'static str = "Synced";

   #[inline]
   fn attempt(&self) {
      BuiltinOnce::attempt(self);
   }

   #[inline]
   fn value(&self) -> u64 {
      BuiltinOnce::value(self)
   }
}
