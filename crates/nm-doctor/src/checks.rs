use crate::diagnostics::{CheckFinding, TroubleshootReport};
use nm_core::{tool_exists, CommandRunner, RunContext};
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(20);

/// Read-only diagnostic tree. Runs a fixed sequence of checks and reports
/// findings; nothing here branches on an intermediate result or mutates
/// the host.
pub struct NetworkChecks<'a, R> {
    runner: &'a R,
    ctx: &'a RunContext,
}

impl<'a, R: CommandRunner> NetworkChecks<'a, R> {
    pub fn new(runner: &'a R, ctx: &'a RunContext) -> Self {
        Self { runner, ctx }
    }

    pub async fn run_all(&self, domain: &str) -> TroubleshootReport {
        let mut report = TroubleshootReport::new();
        report.add_section("connectivity", self.check_connectivity().await);
        report.add_section("DNS resolution", self.check_dns(domain).await);
        report.add_section("firewall", self.check_firewall().await);
        report.add_section("proxy environment", self.check_proxy().await);
        report.add_section("server location", self.location_note());
        report
    }

    /// Reach a known-good public address and a known-good domestic resolver.
    async fn check_connectivity(&self) -> Vec<CheckFinding> {
        let mut findings = Vec::new();

        for (addr, label) in [("8.8.8.8", "public internet"), ("114.114.114.114", "domestic resolver")] {
            match self.runner.run("ping", &["-c", "3", addr], CHECK_TIMEOUT).await {
                Ok(out) if out.success() => {
                    findings.push(CheckFinding::info(
                        format!("{} reachable", label),
                        format!("ping {} succeeded", addr),
                    ));
                }
                Ok(_) => {
                    findings.push(
                        CheckFinding::error(
                            format!("{} unreachable", label),
                            format!("ping {} failed", addr),
                        )
                        .with_suggestion("check default route and outbound ICMP policy"),
                    );
                }
                Err(e) => {
                    findings.push(CheckFinding::warning(
                        "ping unavailable",
                        format!("could not run ping: {}", e),
                    ));
                }
            }
        }

        findings
    }

    /// Resolve the target domain with whichever lookup tool is installed.
    async fn check_dns(&self, domain: &str) -> Vec<CheckFinding> {
        let mut findings = Vec::new();

        if tool_exists(self.runner, "nslookup").await {
            findings.push(self.lookup_finding("nslookup", &[domain], domain).await);
        } else {
            findings.push(CheckFinding::warning(
                "nslookup not installed",
                "skipping nslookup check",
            ));
        }

        if tool_exists(self.runner, "dig").await {
            findings.push(self.lookup_finding("dig", &[domain], domain).await);
        } else {
            findings.push(
                CheckFinding::warning("dig not installed", "skipping dig check")
                    .with_suggestion("install dnsutils (apt) or bind-utils (dnf/yum)"),
            );
        }

        findings
    }

    async fn lookup_finding(&self, tool: &str, args: &[&str], domain: &str) -> CheckFinding {
        match self.runner.run(tool, args, CHECK_TIMEOUT).await {
            Ok(out) if out.success() => CheckFinding::info(
                format!("{} resolves via {}", domain, tool),
                out.stdout.trim().to_string(),
            ),
            Ok(out) => CheckFinding::error(
                format!("{} fails to resolve via {}", domain, tool),
                out.stderr.trim().to_string(),
            ),
            Err(e) => CheckFinding::warning(format!("{} unavailable", tool), e.to_string()),
        }
    }

    /// Report DROP/REJECT rules and UFW state; read-only.
    async fn check_firewall(&self) -> Vec<CheckFinding> {
        let mut findings = Vec::new();

        match self.runner.run("iptables", &["-L", "-n"], CHECK_TIMEOUT).await {
            Ok(out) if out.success() => {
                let blocking: Vec<&str> = out
                    .stdout
                    .lines()
                    .filter(|l| l.contains("DROP") || l.contains("REJECT"))
                    .collect();
                if blocking.is_empty() {
                    findings.push(CheckFinding::info(
                        "no blocking iptables rules",
                        "no DROP/REJECT entries found",
                    ));
                } else {
                    findings.push(
                        CheckFinding::warning(
                            "blocking iptables rules present",
                            format!("{} DROP/REJECT line(s)", blocking.len()),
                        )
                        .with_suggestion("review with: iptables -L -n -v"),
                    );
                }
            }
            Ok(_) | Err(_) => findings.push(CheckFinding::warning(
                "iptables not inspectable",
                "could not list rules (missing tool or insufficient privileges)",
            )),
        }

        if tool_exists(self.runner, "ufw").await {
            match self.runner.run("ufw", &["status"], CHECK_TIMEOUT).await {
                Ok(out) if out.success() => findings.push(CheckFinding::info(
                    "ufw status",
                    out.stdout.trim().to_string(),
                )),
                Ok(_) | Err(_) => findings.push(CheckFinding::warning(
                    "ufw status unavailable",
                    "ufw present but status query failed",
                )),
            }
        }

        findings
    }

    /// Proxy settings in the environment and in /etc/environment.
    async fn check_proxy(&self) -> Vec<CheckFinding> {
        let mut findings = Vec::new();

        let proxied: Vec<String> = std::env::vars()
            .filter(|(k, _)| k.to_ascii_lowercase().contains("proxy"))
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        if proxied.is_empty() {
            findings.push(CheckFinding::info(
                "no proxy variables set",
                "environment has no *proxy* variables",
            ));
        } else {
            findings.push(
                CheckFinding::warning("proxy variables set", proxied.join(", "))
                    .with_suggestion("a stale proxy can black-hole HTTPS requests"),
            );
        }

        if let Ok(content) = std::fs::read_to_string("/etc/environment") {
            let lines: Vec<&str> = content
                .lines()
                .filter(|l| l.to_ascii_lowercase().contains("proxy"))
                .collect();
            if !lines.is_empty() {
                findings.push(CheckFinding::warning(
                    "system-wide proxy configured",
                    lines.join("; "),
                ));
            }
        }

        findings
    }

    fn location_note(&self) -> Vec<CheckFinding> {
        let geo = &self.ctx.geo;
        if geo.is_domestic {
            vec![CheckFinding::info(
                "domestic server",
                "domestic hosts normally reach the code host directly; a failure here points at local network configuration",
            )]
        } else {
            vec![CheckFinding::warning(
                "overseas server",
                "overseas hosts often cannot reach the domestic code host directly",
            )
            .with_suggestion("see the manual workarounds printed after remediation")]
        }
    }
}
