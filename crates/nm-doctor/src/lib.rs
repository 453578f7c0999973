pub mod advice;
pub mod checks;
pub mod diagnostics;
pub mod readback;
pub mod remedy;

pub use checks::NetworkChecks;
pub use diagnostics::{CheckFinding, CheckLevel, TroubleshootReport};
pub use readback::SettingsReadback;
pub use remedy::{RemediationEngine, RemediationOutcome};

use nm_core::{CommandRunner, RunContext, CODE_HOST_FALLBACK_IP};
use nm_probe::{probe, resolve, ProbeConfig};
use std::path::PathBuf;

/// Escalation controller for the target endpoint.
///
/// Strategies are tried strictly in order, stopping at the first success:
/// domain probe, then IP probe with the domain forced as virtual host, then
/// the troubleshoot path (read-only diagnostics, automated remediation,
/// static advice). The troubleshoot state is terminal: even when the
/// remediation re-probe succeeds, the controller only reports it and still
/// returns `false` for this verification pass.
pub struct ConnectivityVerifier<'a, R> {
    runner: &'a R,
    ctx: &'a RunContext,
    hosts_path: PathBuf,
    http: Option<reqwest::Client>,
    config: ProbeConfig,
}

impl<'a, R: CommandRunner> ConnectivityVerifier<'a, R> {
    pub fn new(runner: &'a R, ctx: &'a RunContext, http: reqwest::Client) -> Self {
        Self {
            runner,
            ctx,
            hosts_path: PathBuf::from(nm_hosts::SYSTEM_HOSTS_PATH),
            http: Some(http),
            config: ProbeConfig::default(),
        }
    }

    /// Verifier without the online DoH remediation fallback.
    pub fn offline(runner: &'a R, ctx: &'a RunContext) -> Self {
        Self {
            runner,
            ctx,
            hosts_path: PathBuf::from(nm_hosts::SYSTEM_HOSTS_PATH),
            http: None,
            config: ProbeConfig::default(),
        }
    }

    pub fn with_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_path = path.into();
        self
    }

    pub fn with_config(mut self, config: ProbeConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns whether the domain was verified reachable by one of the two
    /// probe strategies.
    pub async fn verify(&self, domain: &str) -> bool {
        println!("\n🔍 Verifying access to {} (up to {} attempts)...", domain, self.config.max_attempts);
        if probe(self.runner, domain, None, &self.config).await.succeeded {
            return true;
        }

        println!("\n⚠️  Domain access failed, trying the resolved address directly...");
        let resolved = resolve(self.runner, domain, CODE_HOST_FALLBACK_IP).await;
        println!("  using {} (via {:?})", resolved.ip, resolved.source);
        if probe(self.runner, &resolved.ip, Some(domain), &self.config)
            .await
            .succeeded
        {
            return true;
        }

        println!("\n❌ {} unreachable by domain and by address, starting troubleshoot...", domain);
        self.troubleshoot(domain).await;
        false
    }

    /// Terminal state: diagnose, remediate, advise. Never loops back.
    async fn troubleshoot(&self, domain: &str) {
        let report = NetworkChecks::new(self.runner, self.ctx)
            .run_all(domain)
            .await;
        report.display();

        let mut reprobe = ProbeConfig::reprobe();
        reprobe.retry_delay = self.config.retry_delay;
        let engine = match &self.http {
            Some(client) => RemediationEngine::new(self.runner, client.clone()),
            None => RemediationEngine::offline(self.runner),
        }
        .with_hosts_path(&self.hosts_path)
        .with_reprobe_config(reprobe);

        let outcome = engine.remediate(domain).await;

        println!("\n📋 Remediation outcome:");
        println!("  resolver cache flushed: {}", outcome.cache_flushed);
        println!("  lookup tools installed: {}", outcome.tools_installed);
        println!("  hosts entries updated:  {}", outcome.hosts_updated);
        println!("  re-probe succeeded:     {}", outcome.reprobe_succeeded);

        if !outcome.tools_installed {
            advice::suggest_tool_install();
        }
        if !self.ctx.geo.is_domestic {
            advice::present_overseas_workarounds(domain);
        }
        advice::present_alternatives(domain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_core::testkit::{Scripted, ScriptedRunner};
    use std::io::Write;
    use std::time::Duration;

    fn fast() -> ProbeConfig {
        ProbeConfig::default().with_retry_delay(Duration::ZERO)
    }

    fn temp_hosts() -> (tempfile::NamedTempFile, std::path::PathBuf) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"127.0.0.1 localhost\n").unwrap();
        let path = file.path().to_path_buf();
        (file, path)
    }

    #[tokio::test]
    async fn domain_success_skips_every_other_strategy() {
        let runner = ScriptedRunner::new().on("curl", Scripted::ok("HTTP/2 200"));
        let ctx = RunContext::unclassified();

        let verifier = ConnectivityVerifier::offline(&runner, &ctx).with_config(fast());
        assert!(verifier.verify("gitee.com").await);

        assert_eq!(runner.calls_matching("curl"), 1);
        // no resolution, no diagnostics, no remediation
        assert_eq!(runner.calls_matching("which"), 0);
        assert_eq!(runner.calls_matching("ping"), 0);
        assert_eq!(runner.calls_matching("systemctl"), 0);
    }

    #[tokio::test]
    async fn ip_probe_entered_only_after_domain_exhausted() {
        // Domain probe fails 5/5, IP probe succeeds immediately.
        let mut responses = vec![Scripted::exit(7); 5];
        responses.push(Scripted::ok("HTTP/2 200"));
        let runner = ScriptedRunner::new()
            .on_sequence("curl", responses)
            .on("which dig", Scripted::ok("/usr/bin/dig"))
            .on("dig +short gitee.com", Scripted::ok("180.76.198.77\n"));
        let ctx = RunContext::unclassified();

        let verifier = ConnectivityVerifier::offline(&runner, &ctx).with_config(fast());
        assert!(verifier.verify("gitee.com").await);

        let curls: Vec<String> = runner
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("curl"))
            .collect();
        assert_eq!(curls.len(), 6);
        assert!(curls[..5].iter().all(|c| c.contains("https://gitee.com")));
        assert!(curls[5].contains("https://180.76.198.77"));
        assert!(curls[5].contains("-H Host: gitee.com"));
        // never reached troubleshoot
        assert_eq!(runner.calls_matching("systemctl"), 0);
    }

    #[tokio::test]
    async fn full_failure_runs_troubleshoot_and_reports_false() {
        let (_guard, hosts_path) = temp_hosts();
        let runner = ScriptedRunner::new()
            .on("curl", Scripted::exit(7))
            .on("which", Scripted::exit(1))
            .on(
                "ping -c 1 gitee.com",
                Scripted::ok("PING gitee.com (212.64.62.174) 56(84) bytes of data.\n"),
            )
            .on("ping -c 3", Scripted::ok(""))
            .on("iptables", Scripted::ok("Chain INPUT (policy ACCEPT)\n"));
        let ctx = RunContext::unclassified();

        let verifier = ConnectivityVerifier::offline(&runner, &ctx)
            .with_hosts_path(&hosts_path)
            .with_config(fast());
        assert!(!verifier.verify("gitee.com").await);

        // 5 domain + 5 ip + 3 remediation re-probe attempts
        assert_eq!(runner.calls_matching("curl"), 13);
        // remediation ran: cache flush and hosts rewrite happened
        assert_eq!(runner.calls_matching("systemctl restart systemd-resolved"), 1);
        let content = std::fs::read_to_string(&hosts_path).unwrap();
        assert!(content.contains("212.64.62.174 gitee.com"));
    }

    #[tokio::test]
    async fn remediation_success_still_reports_unverified() {
        // Both probe strategies fail; the remediation re-probe succeeds.
        let (_guard, hosts_path) = temp_hosts();
        let mut responses = vec![Scripted::exit(7); 10];
        responses.push(Scripted::ok("HTTP/2 200"));
        let runner = ScriptedRunner::new()
            .on_sequence("curl", responses)
            .on("which", Scripted::exit(1))
            .on("ping -c 1 gitee.com", Scripted::exit(2))
            .on("ping -c 3", Scripted::ok(""))
            .on("iptables", Scripted::ok(""));
        let ctx = RunContext::unclassified();

        let verifier = ConnectivityVerifier::offline(&runner, &ctx)
            .with_hosts_path(&hosts_path)
            .with_config(fast());

        // Terminal troubleshoot state: the controller does not loop back to
        // the domain probe, it only reports.
        assert!(!verifier.verify("gitee.com").await);
        assert_eq!(runner.calls_matching("curl"), 11);
    }
}
