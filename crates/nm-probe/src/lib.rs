pub mod probe;
pub mod resolver;

pub use probe::{probe, AttemptOutcome, ProbeAttempt, ProbeConfig, ProbeResult};
pub use resolver::{resolve, ResolutionSource, ResolvedAddress};
