use std::sync::Arc;
use std::time::Duration;

use once_guards::driver;
use once_guards::{BuiltinOnce, LockedOnce, UnguardedOnce};

fn main() {
   // Run the same experiment a few times; only the naive guard's value moves around.
   for round in 1..=3 {
      println!("Round {round}:");

      let naive = Arc::new(UnguardedOnce::with_race_window(Duration::from_millis(1)));
      let synced = Arc::new(BuiltinOnce::new());
      let manual = Arc::new(LockedOnce::new());

      let naive = driver::hammer(&naive, driver::ITERATIONS).unwrap();
      let synced = driver::hammer(&synced, driver::ITERATIONS).unwrap();
      let manual = driver::hammer(&manual, driver::ITERATIONS).unwrap();

      println!("  {naive}");
      println!("  {synced}");
      println!("  {manual}");

      assert_eq!(synced.value, 1);
      assert_eq!(manual.value, 1);
   }
}
