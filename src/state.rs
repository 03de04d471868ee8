//! Run-once state machine shared by [`RunOnce`](crate::RunOnce) and everything built on it.
//!
//! The contract-level machine has three states: NOT_RUN, RUNNING and DONE. They are
//! packed into a single `AtomicU8` together with bookkeeping for parked callers:
//! - Bit 0: DONE - the effect has completed
//! - Bit 1: RUNNING - a caller won the race and is executing the effect
//! - Bit 2: WAITING - at least one caller is parked on this state
//! - Bits 3-7: EPOCH - bumped on every publication so parked callers see a change
//!
//! Once DONE is set, every later caller observes it with a single atomic load and
//! never touches the parking lot.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Packed atomic state of a run-once primitive.
#[repr(transparent)]
pub(crate) struct RunState(AtomicU8);

impl RunState {
   const DONE: u8 = 1;
   const RUNNING: u8 = 2;
   const WAITING: u8 = 4;
   const EPOCH_1: u8 = 8;
   const EPOCH_MASK: u8 = !(Self::DONE | Self::RUNNING | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(state: u8) -> u8 {
      (state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// NOT_RUN.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Already DONE; no caller will ever run an effect on it.
   #[inline]
   pub(crate) const fn done() -> Self {
      Self(AtomicU8::new(Self::DONE))
   }

   #[inline]
   fn key(&self) -> usize {
      self.0.as_ptr() as usize
   }

   /// Wakes every caller parked on this state.
   #[inline]
   fn unpark_all(&self) {
      // SAFETY: `key` is the address of our atomic, the same key `park` uses, and it
      // stays valid for as long as `self` is borrowed.
      unsafe {
         parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the caller as long as the state still reads `observed`.
   #[inline]
   fn park(&self, observed: u8) {
      // SAFETY: see `unpark_all`. The validate closure runs under the bucket lock, so
      // a publication between our load and the sleep is never missed.
      unsafe {
         let _ = parking_lot_core::park(
            self.key(),
            || self.0.load(Ordering::Acquire) == observed,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
      // Wake-ups may be spurious; callers always re-run `acquire_step`.
   }

   /// Publishes `flags` (with a fresh epoch) and wakes parked callers if any were waiting.
   /// Returns the previous raw state.
   #[inline]
   fn publish(&self, flags: u8) -> u8 {
      let current = self.0.load(Ordering::Relaxed);
      let prev = self
         .0
         .swap(flags | Self::next_epoch(current), Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.unpark_all();
      }
      prev
   }

   /// RUNNING -> DONE. Release ordering makes the effect's writes visible to every
   /// caller that later observes DONE with an Acquire load.
   #[inline]
   fn set_done(&self) {
      let prev = self.publish(Self::DONE);
      debug_assert!(prev & Self::DONE == 0, "effect published twice");
   }

   /// RUNNING -> NOT_RUN, used when the effect did not complete.
   #[inline]
   fn set_not_run(&self) {
      self.publish(0);
   }

   #[inline]
   pub(crate) fn is_done(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::DONE != 0
   }

   /// One acquisition attempt.
   ///
   /// - `Ok(None)`: already DONE.
   /// - `Ok(Some(guard))`: this caller moved NOT_RUN -> RUNNING.
   /// - `Err(state)`: someone else is RUNNING; `state` is what a parked caller should
   ///   wait on. Unless `nowait`, the WAITING bit is set in it.
   #[inline]
   fn acquire_step(&self, nowait: bool) -> Result<Option<RunGuard<'_>>, u8> {
      loop {
         let state = self.0.load(Ordering::Acquire);
         if state & Self::DONE != 0 {
            return Ok(None);
         }

         if state & Self::RUNNING == 0 {
            match self.0.compare_exchange_weak(
               state,
               state | Self::RUNNING,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Some(RunGuard::new(self))),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && state & Self::WAITING == 0 {
            let waiting = state | Self::WAITING;
            match self
               .0
               .compare_exchange_weak(state, waiting, Ordering::Relaxed, Ordering::Relaxed)
            {
               Ok(_) => return Err(waiting),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         return Err(state);
      }
   }

   /// Blocking acquisition. `None` means the effect is already DONE, possibly after
   /// parking until the running caller published it.
   #[inline]
   pub(crate) fn acquire(&self) -> Option<RunGuard<'_>> {
      let mut observed = match self.acquire_step(false) {
         Ok(guard) => return guard,
         Err(state) => state,
      };
      loop {
         self.park(observed);
         match self.acquire_step(false) {
            Ok(guard) => return guard,
            Err(state) => observed = state,
         }
      }
   }

   /// Async acquisition for [`RunOnce::call_once_async`](crate::RunOnce::call_once_async).
   ///
   /// While another task is RUNNING the caller yields to the scheduler, so on a
   /// current-thread runtime the running task gets the thread it needs to finish. That
   /// loop never blocks the thread and never gives up. On a multi-thread runtime a caller
   /// that is still waiting after `YIELDS_BEFORE_PARK` yields parks its worker through
   /// `block_in_place` instead of burning it.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn acquire_async(&self) -> Option<RunGuard<'_>> {
      const YIELDS_BEFORE_PARK: u32 = 64;

      loop {
         let observed = match self.acquire_step(false) {
            Ok(guard) => return guard,
            Err(state) => state,
         };

         let mut yields = 0;
         while self.0.load(Ordering::Acquire) == observed {
            if yields >= YIELDS_BEFORE_PARK {
               if let Some(acquired) = self.park_worker(observed) {
                  return acquired;
               }
            }
            tokio::task::yield_now().await;
            yields += 1;
         }
      }
   }

   /// Parks the current worker thread inside `block_in_place` and finishes the blocking
   /// acquisition there. `None` when the runtime cannot do that: `block_in_place` panics
   /// on a current-thread runtime.
   #[cfg(feature = "async-tokio-mt")]
   fn park_worker(&self, observed: u8) -> Option<Option<RunGuard<'_>>> {
      use tokio::runtime::{Handle, RuntimeFlavor};

      let flavor = Handle::try_current().ok()?.runtime_flavor();
      if flavor != RuntimeFlavor::MultiThread {
         return None;
      }
      Some(tokio::task::block_in_place(|| {
         self.park(observed);
         self.acquire()
      }))
   }

   #[cfg(all(feature = "async-tokio", not(feature = "async-tokio-mt")))]
   fn park_worker(&self, _observed: u8) -> Option<Option<RunGuard<'_>>> {
      None
   }

   /// Non-blocking acquisition: `None` if DONE or currently RUNNING elsewhere.
   #[inline]
   pub(crate) fn try_acquire(&self) -> Option<RunGuard<'_>> {
      self.acquire_step(true).ok().flatten()
   }
}

/// Proof that the holder is the single caller in RUNNING.
///
/// `commit` publishes DONE. Dropping the guard without committing (the effect panicked
/// or returned an error) publishes NOT_RUN so the next caller can try again.
pub(crate) struct RunGuard<'a> {
   state: &'a RunState,
}

impl<'a> RunGuard<'a> {
   #[inline(always)]
   const fn new(state: &'a RunState) -> Self {
      Self { state }
   }

   #[inline(always)]
   pub(crate) fn commit(self) {
      self.state.set_done();
      mem::forget(self);
   }
}

impl Drop for RunGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.state.set_not_run();
   }
}
