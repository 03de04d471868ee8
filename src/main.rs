use once_guards::driver::{self, ITERATIONS};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
   tracing_subscriber::fmt()
      .with_env_filter(
         EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
      )
      .with_writer(std::io::stderr)
      .init();

   for report in driver::run_all(ITERATIONS)? {
      println!("{report}");
   }

   Ok(())
}
