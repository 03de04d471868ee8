//! A dedicated run-once primitive.
//!
//! [`RunOnce`] executes a caller-supplied effect at most once to completion, no matter
//! how many threads or tasks race to call it. Callers that arrive while the effect is
//! running park until it finishes; callers that arrive afterwards see the completed
//! state with a single atomic load and return immediately.

use core::fmt;
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future::Future;
use core::sync::atomic::Ordering;

use super::state::RunState;

/// Runs an effect exactly once across any number of concurrent callers.
///
/// An effect that panics or (for [`try_call_once`](Self::try_call_once)) returns an error
/// does not count as having run: the primitive goes back to its initial state and the
/// next caller gets to try.
pub struct RunOnce {
   state: RunState,
}

impl RunOnce {
   /// Creates a primitive whose effect has not run yet.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: RunState::new(),
      }
   }

   /// Creates a primitive that is already completed; effects passed to it never run.
   #[inline]
   #[must_use]
   pub const fn completed() -> Self {
      Self {
         state: RunState::done(),
      }
   }

   /// Returns `true` once an effect has run to completion.
   ///
   /// This method never blocks. A `true` result synchronizes with the completed
   /// effect, so its writes are visible to the caller.
   #[inline]
   pub fn is_completed(&self) -> bool {
      self.state.is_done(Ordering::Acquire)
   }

   /// Runs `f` if no effect has completed yet, blocking while another caller's
   /// effect is in progress.
   ///
   /// Returns `true` if this call ran `f`. When it returns, an effect has completed.
   #[inline]
   pub fn call_once<F>(&self, f: F) -> bool
   where
      F: FnOnce(),
   {
      if self.is_completed() {
         return false;
      }
      self.call_once_slow(f)
   }

   /// Like [`call_once`](Self::call_once), for an effect that can fail.
   ///
   /// - `Ok(true)`: this call ran `f` and it succeeded.
   /// - `Ok(false)`: some other call completed an effect.
   /// - `Err(e)`: this call ran `f`, it failed, and the primitive is back to not having run.
   pub fn try_call_once<F, E>(&self, f: F) -> Result<bool, E>
   where
      F: FnOnce() -> Result<(), E>,
   {
      if self.is_completed() {
         return Ok(false);
      }
      let Some(guard) = self.state.acquire() else {
         return Ok(false);
      };
      f()?; // Dropping the guard on error resets to not-run and wakes waiters.
      guard.commit();
      Ok(true)
   }

   /// Runs `f` only if nobody has run or is running an effect right now.
   ///
   /// Never blocks. Returns `true` if this call ran `f`.
   #[inline]
   pub fn call_once_nowait<F>(&self, f: F) -> bool
   where
      F: FnOnce(),
   {
      let Some(guard) = self.state.try_acquire() else {
         return false;
      };
      f();
      guard.commit();
      true
   }

   /// Async version of [`call_once`](Self::call_once): awaits the effect's future while
   /// holding the primitive, and yields instead of blocking while another task runs it.
   ///
   /// On a current-thread runtime waiting callers only yield, so the running task always
   /// gets to finish. Returns `true` if this call ran `f`.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[inline]
   pub async fn call_once_async<F, Fut>(&self, f: F) -> bool
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = ()>,
   {
      if self.is_completed() {
         return false;
      }
      let Some(guard) = self.state.acquire_async().await else {
         return false;
      };
      f().await;
      guard.commit();
      true
   }

   #[cold]
   fn call_once_slow<F>(&self, f: F) -> bool
   where
      F: FnOnce(),
   {
      let Some(guard) = self.state.acquire() else {
         return false; // Someone else completed it while we were parked.
      };
      f();
      guard.commit();
      true
   }
}

impl Default for RunOnce {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl fmt::Debug for RunOnce {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("RunOnce")
         .field("completed", &self.is_completed())
         .finish()
   }
}
