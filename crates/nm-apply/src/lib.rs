//! One-shot, unconditional system mutations: DNS servers, hosts-table
//! overrides for the code hosts, Docker registry mirrors, git URL rewrites
//! and TCP sysctl tuning. No retries, no state, no decision logic — the
//! verification subsystem in `nm-doctor` is where the escalation lives.

pub mod dns;
pub mod docker;
pub mod git_hosts;
pub mod sysctl;

pub use dns::apply_dns;
pub use docker::apply_docker_mirrors;
pub use git_hosts::{optimize_code_host, optimize_github};
pub use sysctl::apply_sysctl_tuning;
