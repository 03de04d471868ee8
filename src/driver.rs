//! Drives many concurrent attempts against a guard and reports the outcome.
//!
//! Attempts are released together through a start gate and every worker is joined
//! before the counter is read, so a report always reflects all attempts.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use tracing::{info, trace};

use crate::counter::OnceCounter;
use crate::error::DriverError;
use crate::{BuiltinOnce, LockedOnce, UnguardedOnce};

/// Number of concurrent attempts made against each guard.
pub const ITERATIONS: usize = 10;

/// Delay injected into the naive guard by [`run_all`] so its race shows up reliably.
pub const NAIVE_RACE_WINDOW: Duration = Duration::from_millis(1);

/// Final counter value of one guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
   pub label: &'static str,
   pub value: u64,
}

impl Report {
   pub fn of<G: OnceCounter>(guard: &G) -> Self {
      Self {
         label: G::LABEL,
         value: guard.value(),
      }
   }
}

impl fmt::Display for Report {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{} value: {}", self.label, self.value)
   }
}

/// Calls [`OnceCounter::attempt`] from `attempts` threads at once and waits for all of
/// them before reading the counter.
pub fn hammer<G>(guard: &Arc<G>, attempts: usize) -> Result<Report, DriverError>
where
   G: OnceCounter + 'static,
{
   // Workers block on a read lock until the write lock below is released. If spawning
   // fails halfway, returning drops the write lock and the spawned workers still finish.
   let gate = Arc::new(RwLock::new(()));
   let closed = gate.write().unwrap_or_else(|poisoned| poisoned.into_inner());

   let mut workers = Vec::with_capacity(attempts);
   for index in 0..attempts {
      let guard = Arc::clone(guard);
      let gate = Arc::clone(&gate);
      let worker = thread::Builder::new()
         .name(format!("attempt-{index}"))
         .spawn(move || {
            drop(gate.read());
            trace!(label = G::LABEL, index, "attempting");
            guard.attempt();
         })
         .map_err(|source| DriverError::Spawn {
            label: G::LABEL,
            index,
            source,
         })?;
      workers.push(worker);
   }
   drop(closed);

   let mut panicked = None;
   for (index, worker) in workers.into_iter().enumerate() {
      if worker.join().is_err() && panicked.is_none() {
         panicked = Some(index);
      }
   }
   if let Some(index) = panicked {
      return Err(DriverError::AttemptPanicked {
         label: G::LABEL,
         index,
      });
   }

   let report = Report::of(&**guard);
   info!(label = report.label, value = report.value, attempts, "all attempts finished");
   Ok(report)
}

/// Async counterpart of [`hammer`] for [`BuiltinOnce`]: spawns `attempts` tokio tasks
/// calling [`BuiltinOnce::attempt_async`] and joins all of them.
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
pub async fn hammer_async(once: &Arc<BuiltinOnce>, attempts: usize) -> Result<Report, DriverError> {
   let mut tasks = tokio::task::JoinSet::new();
   for _ in 0..attempts {
      let once = Arc::clone(once);
      tasks.spawn(async move { once.attempt_async().await });
   }
   while let Some(joined) = tasks.join_next().await {
      joined?;
   }

   let report = Report::of(&**once);
   info!(label = report.label, value = report.value, attempts, "all async attempts finished");
   Ok(report)
}

/// Runs `attempts` concurrent attempts against a fresh instance of every guard.
///
/// Reports come back in the order naive, synced, manually synced.
pub fn run_all(attempts: usize) -> Result<Vec<Report>, DriverError> {
   let naive = Arc::new(UnguardedOnce::with_race_window(NAIVE_RACE_WINDOW));
   let synced = Arc::new(BuiltinOnce::new());
   let manual = Arc::new(LockedOnce::new());

   Ok(vec![
      hammer(&naive, attempts)?,
      hammer(&synced, attempts)?,
      hammer(&manual, attempts)?,
   ])
}
