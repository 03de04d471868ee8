use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use once_guards::{BuiltinOnce, LockedOnce, OnceCounter, UnguardedOnce};
use test_case::test_case;

/// Calls `attempt_with` from `n` threads released together and returns how many times
/// the hook ran.
fn hammer_with<G, F>(guard: &Arc<G>, n: usize, attempt_with: F) -> usize
where
   G: Send + Sync + 'static,
   F: Fn(&G, &dyn Fn()) + Send + Sync + Copy + 'static,
{
   let hook_runs = Arc::new(AtomicUsize::new(0));
   let barrier = Arc::new(Barrier::new(n.max(1)));
   let threads: Vec<_> = (0..n)
      .map(|_| {
         let guard = Arc::clone(guard);
         let hook_runs = Arc::clone(&hook_runs);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            attempt_with(&*guard, &|| {
               hook_runs.fetch_add(1, Ordering::SeqCst);
               // Widen the window in which other threads could slip in
               thread::sleep(Duration::from_millis(5));
            });
         })
      })
      .collect();

   for handle in threads {
      handle.join().unwrap();
   }
   hook_runs.load(Ordering::SeqCst)
}

#[test]
fn test_fresh_guards_are_zero() {
   assert_eq!(UnguardedOnce::new().value(), 0);
   assert_eq!(LockedOnce::new().value(), 0);
   assert_eq!(BuiltinOnce::new().value(), 0);
   assert!(!UnguardedOnce::default().is_done());
   assert!(!LockedOnce::default().is_done());
   assert!(!BuiltinOnce::default().is_done());
}

#[test]
fn test_labels() {
   assert_eq!(UnguardedOnce::LABEL, "Naive");
   assert_eq!(LockedOnce::LABEL, "Manually synced");
   assert_eq!(BuiltinOnce::LABEL, "Synced");
}

#[test]
fn test_single_attempt_increments_all() {
   let naive = UnguardedOnce::new();
   let manual = LockedOnce::new();
   let synced = BuiltinOnce::new();

   naive.attempt();
   manual.attempt();
   synced.attempt();

   assert_eq!(naive.value(), 1);
   assert_eq!(manual.value(), 1);
   assert_eq!(synced.value(), 1);
   assert!(naive.is_done());
   assert!(manual.is_done());
   assert!(synced.is_done());
}

#[test]
fn test_sequential_attempts_are_idempotent() {
   // Without concurrency even the naive guard behaves
   let naive = UnguardedOnce::new();
   let manual = LockedOnce::new();
   let synced = BuiltinOnce::new();

   for _ in 0..5 {
      naive.attempt();
      manual.attempt();
      synced.attempt();
   }

   assert_eq!(naive.value(), 1);
   assert_eq!(manual.value(), 1);
   assert_eq!(synced.value(), 1);
}

#[test_case(0 ; "no attempts")]
#[test_case(1 ; "one attempt")]
#[test_case(10 ; "ten attempts")]
#[test_case(64 ; "many attempts")]
fn test_locked_effect_runs_once(n: usize) {
   let guard = Arc::new(LockedOnce::new());
   let hook_runs = hammer_with(&guard, n, |guard, hook| guard.attempt_with(hook));

   let expected = n.min(1);
   assert_eq!(hook_runs, expected);
   assert_eq!(guard.value(), expected as u64);
}

#[test_case(0 ; "no attempts")]
#[test_case(1 ; "one attempt")]
#[test_case(10 ; "ten attempts")]
#[test_case(64 ; "many attempts")]
fn test_builtin_effect_runs_once(n: usize) {
   let guard = Arc::new(BuiltinOnce::new());
   let hook_runs = hammer_with(&guard, n, |guard, hook| guard.attempt_with(hook));

   let expected = n.min(1);
   assert_eq!(hook_runs, expected);
   assert_eq!(guard.value(), expected as u64);
}

#[test_case(0 ; "no attempts")]
#[test_case(1 ; "one attempt")]
fn test_unguarded_without_contention(n: usize) {
   let guard = Arc::new(UnguardedOnce::new());
   let hook_runs = hammer_with(&guard, n, |guard, hook| guard.attempt_with(hook));

   assert_eq!(hook_runs, n);
   assert_eq!(guard.value(), n as u64);
}

#[test]
fn test_unguarded_can_exceed_one() {
   // How far the counter drifts depends on the scheduler, so only check that it
   // drifted at all in some trial.
   const TRIALS: usize = 20;
   const N: usize = 10;

   let mut worst = 0;
   for _ in 0..TRIALS {
      let guard = Arc::new(UnguardedOnce::with_race_window(Duration::from_millis(5)));
      let hook_runs = hammer_with(&guard, N, |guard, hook| guard.attempt_with(hook));

      // Every slip past the check is counted, never more than one per caller
      assert_eq!(guard.value(), hook_runs as u64);
      assert!((1..=N as u64).contains(&guard.value()));
      worst = worst.max(guard.value());
      if worst > 1 {
         break;
      }
   }
   assert!(worst > 1, "naive guard never raced in {TRIALS} trials");
}

#[test]
fn test_attempt_after_completion_is_noop() {
   let manual = Arc::new(LockedOnce::new());
   let synced = Arc::new(BuiltinOnce::new());
   hammer_with(&manual, 10, |guard, hook| guard.attempt_with(hook));
   hammer_with(&synced, 10, |guard, hook| guard.attempt_with(hook));

   manual.attempt_with(|| panic!("Should not be called"));
   synced.attempt_with(|| panic!("Should not be called"));
   assert_eq!(manual.value(), 1);
   assert_eq!(synced.value(), 1);
}

#[test]
fn test_try_attempt() {
   let manual = LockedOnce::new();
   assert!(manual.try_attempt());
   assert!(!manual.try_attempt());
   assert_eq!(manual.value(), 1);

   let synced = BuiltinOnce::new();
   assert!(synced.try_attempt());
   assert!(!synced.try_attempt());
   assert_eq!(synced.value(), 1);
}

/// Holds `guard`'s effect open on another thread while `check` runs on this one.
fn while_effect_runs<G: Sync>(guard: &G, attempt_with: fn(&G, &dyn Fn()), check: impl FnOnce()) {
   let (entered_tx, entered_rx) = mpsc::channel();
   let (release_tx, release_rx) = mpsc::channel::<()>();
   thread::scope(|s| {
      s.spawn(move || {
         attempt_with(guard, &|| {
            entered_tx.send(()).unwrap();
            release_rx.recv().unwrap();
         });
      });
      entered_rx.recv().unwrap();
      check();
      release_tx.send(()).unwrap();
   });
}

#[test]
fn test_try_attempt_while_running() {
   // Another thread is inside the effect, so a non-blocking attempt backs off.
   let manual = LockedOnce::new();
   while_effect_runs(
      &manual,
      |guard, hook| guard.attempt_with(hook),
      || assert!(!manual.try_attempt()),
   );
   assert_eq!(manual.value(), 1);

   let synced = BuiltinOnce::new();
   while_effect_runs(
      &synced,
      |guard, hook| guard.attempt_with(hook),
      || {
         assert!(!synced.try_attempt());
         assert!(!synced.is_done());
      },
   );
   assert_eq!(synced.value(), 1);
   assert!(synced.is_done());
}

#[test]
fn test_panicking_hook_leaves_guard_retryable() {
   let manual = LockedOnce::new();
   let synced = BuiltinOnce::new();

   let result = panic::catch_unwind(AssertUnwindSafe(|| manual.attempt_with(|| panic!("boom"))));
   assert!(result.is_err());
   assert_eq!(manual.value(), 0);
   assert!(!manual.is_done());

   let result = panic::catch_unwind(AssertUnwindSafe(|| synced.attempt_with(|| panic!("boom"))));
   assert!(result.is_err());
   assert_eq!(synced.value(), 0);
   assert!(!synced.is_done());

   // The poisoned mutex is recovered and the effect can still run exactly once
   manual.attempt();
   manual.attempt();
   synced.attempt();
   synced.attempt();
   assert_eq!(manual.value(), 1);
   assert_eq!(synced.value(), 1);
}

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_builtin_attempt_async() {
   let synced = Arc::new(BuiltinOnce::new());
   let tasks: Vec<_> = (0..10)
      .map(|_| {
         let synced = Arc::clone(&synced);
         tokio::spawn(async move { synced.attempt_async().await })
      })
      .collect();

   for task in tasks {
      task.await.unwrap();
   }
   assert_eq!(synced.value(), 1);
   assert!(synced.is_done());

   synced.attempt_async().await;
   assert_eq!(synced.value(), 1);
}

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
#[tokio::test]
async fn test_builtin_attempt_async_current_thread() {
   let synced = Arc::new(BuiltinOnce::new());
   let tasks: Vec<_> = (0..10)
      .map(|_| {
         let synced = Arc::clone(&synced);
         tokio::spawn(async move { synced.attempt_async().await })
      })
      .collect();

   for task in tasks {
      task.await.unwrap();
   }
   assert_eq!(synced.value(), 1);
}
