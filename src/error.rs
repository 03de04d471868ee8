use std::io;

/// Failures of the concurrent driver. The guards themselves never fail.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
   #[error("failed to spawn attempt {index} against {label}: {source}")]
   Spawn {
      label: &'static str,
      index: usize,
      #[source]
      source: io::Error,
   },
   #[error("attempt {index} against {label} panicked")]
   AttemptPanicked { label: &'static str, index: usize },
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[error("async attempt failed to join: {0}")]
   TaskJoin(#[from] tokio::task::JoinError),
}
