pub mod context;
pub mod profile;
pub mod report;
pub mod runner;
pub mod testkit;

pub use context::{GeoClassification, RunContext};
pub use profile::{RegionProfile, CODE_HOST_DOMAIN, CODE_HOST_FALLBACK_IP};
pub use report::OptimizationReport;
pub use runner::{tool_exists, CommandOutput, CommandRunner, RunError, SystemRunner};
