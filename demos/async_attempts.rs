use std::sync::Arc;

use once_guards::{driver, BuiltinOnce};

#[tokio::main]
async fn main() {
   let once = Arc::new(BuiltinOnce::new());

   let report = driver::hammer_async(&once, 64).await.unwrap();
   println!("{report}");
   assert_eq!(report.value, 1);

   // Later attempts take the fast path and change nothing
   once.attempt_async().await;
   assert_eq!(once.value(), 1);
}
