//! A run-once guard with no synchronization at all.
//!
//! [`UnguardedOnce`] reads its "already ran" flag, then increments and sets the flag as a
//! separate step. Concurrent callers can all read the flag before any of them writes
//! it, so the counter routinely ends up above one. Every access is atomic, so the race
//! is a logic race and never undefined behavior.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::counter::OnceCounter;

/// Check-then-act guard; not safe to use concurrently.
#[derive(Debug, Default)]
pub struct UnguardedOnce {
   value: AtomicU64,
   ran: AtomicBool,
   race_window: Option<Duration>,
}

impl UnguardedOnce {
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         value: AtomicU64::new(0),
         ran: AtomicBool::new(false),
         race_window: None,
      }
   }

   /// Sleeps for `window` between reading the flag and acting on it, so concurrent
   /// callers reliably overlap.
   #[inline]
   #[must_use]
   pub const fn with_race_window(window: Duration) -> Self {
      Self {
         value: AtomicU64::new(0),
         ran: AtomicBool::new(false),
         race_window: Some(window),
      }
   }

   /// Runs the increment if the flag currently reads unset. See [`attempt_with`](Self::attempt_with).
   #[inline]
   pub fn attempt(&self) {
      self.attempt_with(|| {});
   }

   /// Runs `hook` and then the increment if the flag currently reads unset.
   ///
   /// `hook` runs every time the increment does, which under concurrency may be more
   /// than once.
   pub fn attempt_with<F>(&self, hook: F)
   where
      F: FnOnce(),
   {
      if self.ran.load(Ordering::Relaxed) {
         return;
      }
      if let Some(window) = self.race_window {
         thread::sleep(window);
      }
      hook();
      let value = self.value.fetch_add(1, Ordering::Relaxed) + 1;
      debug!(label = Self::LABEL, value, "set naive value");
      self.ran.store(true, Ordering::Relaxed);
   }

   /// Whether some caller has set the flag. Says nothing about how many did.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.ran.load(Ordering::Relaxed)
   }

   #[inline]
   pub fn value(&self) -> u64 {
      self.value.load(Ordering::Relaxed)
   }
}

impl OnceCounter for UnguardedOnce {
   const LABEL: &'static str = "Naive";

   #[inline]
   fn attempt(&self) {
      UnguardedOnce::attempt(self);
   }

   #[inline]
   fn value(&self) -> u64 {
      UnguardedOnce::value(self)
   }
}
