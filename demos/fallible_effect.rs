use once_guards::RunOnce;

static SCHEMA: RunOnce = RunOnce::new();

fn load_schema(fail: bool) -> Result<bool, &'static str> {
   SCHEMA.try_call_once(|| {
      println!("Loading schema (fail={fail})...");
      if fail {
         Err("schema file missing")
      } else {
         Ok(())
      }
   })
}

fn main() {
   // First attempt fails and leaves the primitive ready for another try
   match load_schema(true) {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert!(!SCHEMA.is_completed());

   // Second attempt succeeds
   assert_eq!(load_schema(false), Ok(true));
   assert!(SCHEMA.is_completed());

   // From now on nothing runs, even an effect that would fail
   assert_eq!(load_schema(true), Ok(false));
   println!("Schema loaded once");
}
