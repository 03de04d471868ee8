//! A run-once guard built from an ordinary mutex.
//!
//! The whole check-then-act sequence of [`UnguardedOnce`](crate::UnguardedOnce) runs
//! while holding a lock that lives next to the data it protects, which makes the
//! sequence atomic with respect to every other caller.

use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::debug;

use crate::counter::OnceCounter;

#[derive(Debug, Default)]
struct Slot {
   value: u64,
   ran: bool,
}

/// Mutex-serialized guard: the increment happens exactly once.
#[derive(Debug, Default)]
pub struct LockedOnce {
   slot: Mutex<Slot>,
}

impl LockedOnce {
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         slot: Mutex::new(Slot {
            value: 0,
            ran: false,
         }),
      }
   }

   // A poisoned lock means a hook panicked before `ran` was written, so the slot is
   // still consistent and the next caller may run the effect.
   #[inline]
   fn lock(&self) -> MutexGuard<'_, Slot> {
      self.slot.lock().unwrap_or_else(PoisonError::into_inner)
   }

   /// Increments the counter unless some caller already did, blocking while another
   /// caller holds the lock.
   #[inline]
   pub fn attempt(&self) {
      self.attempt_with(|| {});
   }

   /// Like [`attempt`](Self::attempt), running `hook` inside the critical section right
   /// before the increment. `hook` runs at most once over the guard's lifetime (unless
   /// it panics).
   pub fn attempt_with<F>(&self, hook: F)
   where
      F: FnOnce(),
   {
      let mut slot = self.lock();
      Self::run_effect(&mut slot, hook);
   }

   /// Runs the effect only if the lock is free right now and the effect has not run.
   ///
   /// Returns `true` if this call ran it.
   pub fn try_attempt(&self) -> bool {
      let mut slot = match self.slot.try_lock() {
         Ok(slot) => slot,
         Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
         Err(TryLockError::WouldBlock) => return false,
      };
      Self::run_effect(&mut slot, || {})
   }

   fn run_effect<F>(slot: &mut Slot, hook: F) -> bool
   where
      F: FnOnce(),
   {
      if slot.ran {
         return false;
      }
      hook();
      slot.value += 1;
      slot.ran = true;
      debug!(label = Self::LABEL, value = slot.value, "set manual value");
      true
   }

   #[inline]
   pub fn is_done(&self) -> bool {
      self.lock().ran
   }

   #[inline]
   pub fn value(&self) -> u64 {
      self.lock().value
   }
}

impl OnceCounter for LockedOnce {
   const LABEL: &'static str = "Manually synced";

   #[inline]
   fn attempt(&self) {
      LockedOnce::attempt(self);
   }

   #[inline]
   fn value(&self) -> u64 {
      LockedOnce::value(self)
   }
}
