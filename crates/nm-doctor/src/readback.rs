use crate::diagnostics::{CheckFinding, TroubleshootReport};
use nm_core::{tool_exists, CommandRunner};
use std::time::Duration;

const READBACK_TIMEOUT: Duration = Duration::from_secs(20);

const GITHUB_URL: &str = "https://github.com";

/// Keys applied by the TCP tuning step, read back with `sysctl -n`.
const TUNED_SYSCTL_KEYS: &[&str] = &["net.ipv4.tcp_congestion_control", "net.core.rmem_max"];

/// Read-only confirmation that the applied optimizations actually took:
/// GitHub resolves and answers over HTTPS, Docker reports its registry
/// mirrors, and the sysctl tuning is live. Runs once, without retries,
/// before the code-host verification escalates.
pub struct SettingsReadback<'a, R> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> SettingsReadback<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    pub async fn run_all(&self) -> TroubleshootReport {
        let mut report = TroubleshootReport::new();
        report.add_section("GitHub resolution", self.check_github_dns().await);
        report.add_section("GitHub reachability", self.check_github_http().await);
        report.add_section("Docker registry mirrors", self.check_docker_mirrors().await);
        report.add_section("TCP tuning", self.check_sysctl().await);
        report
    }

    /// Confirm github.com resolves with whichever lookup tool is installed.
    async fn check_github_dns(&self) -> Vec<CheckFinding> {
        if tool_exists(self.runner, "dig").await {
            vec![self.lookup("dig", &["+short", "github.com"]).await]
        } else if tool_exists(self.runner, "nslookup").await {
            vec![self.lookup("nslookup", &["github.com"]).await]
        } else {
            vec![CheckFinding::warning(
                "no lookup tool installed",
                "cannot confirm github.com resolution",
            )
            .with_suggestion("install dnsutils (apt) or bind-utils (dnf/yum)")]
        }
    }

    async fn lookup(&self, tool: &str, args: &[&str]) -> CheckFinding {
        match self.runner.run(tool, args, READBACK_TIMEOUT).await {
            Ok(out) if out.success() && !out.stdout.trim().is_empty() => {
                CheckFinding::info("github.com resolves", out.stdout.trim().to_string())
            }
            Ok(_) => CheckFinding::error(
                "github.com does not resolve",
                format!("{} returned no usable answer", tool),
            )
            .with_suggestion("check the hosts overrides and configured DNS servers"),
            Err(e) => CheckFinding::warning(format!("{} unavailable", tool), e.to_string()),
        }
    }

    /// One-shot HTTPS check, no retry budget.
    async fn check_github_http(&self) -> Vec<CheckFinding> {
        let args = [
            "-I",
            "--connect-timeout",
            "10",
            "--max-time",
            "15",
            GITHUB_URL,
        ];
        let finding = match self.runner.run("curl", &args, READBACK_TIMEOUT).await {
            Ok(out) if out.success() => CheckFinding::info(
                "github.com answers over HTTPS",
                out.stdout.lines().next().unwrap_or("").trim().to_string(),
            ),
            Ok(out) => CheckFinding::error(
                "github.com not reachable over HTTPS",
                format!("curl exited with code {}", out.exit_code),
            )
            .with_suggestion("the hosts override may point at a stale address"),
            Err(e) => CheckFinding::warning("curl unavailable", e.to_string()),
        };
        vec![finding]
    }

    /// Docker should report the configured mirrors once the daemon restarted.
    async fn check_docker_mirrors(&self) -> Vec<CheckFinding> {
        if !tool_exists(self.runner, "docker").await {
            return vec![CheckFinding::info(
                "docker not installed",
                "skipping registry mirror read-back",
            )];
        }

        match self.runner.run("docker", &["info"], READBACK_TIMEOUT).await {
            Ok(out) if out.success() => {
                let registry_lines: Vec<&str> = out
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower.contains("registry") || lower.contains("mirror")
                    })
                    .collect();
                if registry_lines.is_empty() {
                    vec![CheckFinding::warning(
                        "docker reports no registry mirrors",
                        "docker info has no registry/mirror lines",
                    )
                    .with_suggestion("check /etc/docker/daemon.json and restart docker")]
                } else {
                    vec![CheckFinding::info(
                        "docker registry configuration",
                        registry_lines.join("; "),
                    )]
                }
            }
            Ok(_) | Err(_) => vec![CheckFinding::warning(
                "docker info failed",
                "daemon not running or insufficient privileges",
            )],
        }
    }

    /// Read the tuned kernel keys back; a missing key means the tuning did
    /// not apply.
    async fn check_sysctl(&self) -> Vec<CheckFinding> {
        let mut findings = Vec::new();
        for key in TUNED_SYSCTL_KEYS {
            match self.runner.run("sysctl", &["-n", key], READBACK_TIMEOUT).await {
                Ok(out) if out.success() => findings.push(CheckFinding::info(
                    *key,
                    out.stdout.trim().to_string(),
                )),
                Ok(_) | Err(_) => findings.push(
                    CheckFinding::warning(format!("{} not readable", key), "sysctl query failed")
                        .with_suggestion("re-run with root privileges or reboot"),
                ),
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_core::testkit::{Scripted, ScriptedRunner};

    #[tokio::test]
    async fn healthy_system_reads_back_clean() {
        let runner = ScriptedRunner::new()
            .on("which dig", Scripted::ok("/usr/bin/dig"))
            .on("which docker", Scripted::ok("/usr/bin/docker"))
            .on("which", Scripted::exit(1))
            .on("dig +short github.com", Scripted::ok("140.82.112.3\n"))
            .on("curl", Scripted::ok("HTTP/2 200\n"))
            .on(
                "docker info",
                Scripted::ok(" Registry Mirrors:\n  https://docker.m.daocloud.io/\n"),
            )
            .on("sysctl -n net.ipv4.tcp_congestion_control", Scripted::ok("bbr\n"))
            .on("sysctl -n net.core.rmem_max", Scripted::ok("134217728\n"));

        let report = SettingsReadback::new(&runner).run_all().await;

        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 0);
        // one-shot HTTPS check, no retry budget
        assert_eq!(runner.calls_matching("curl"), 1);
        // read-only: nothing restarted or installed
        assert_eq!(runner.calls_matching("systemctl"), 0);
        assert_eq!(runner.calls_matching("apt"), 0);
    }

    #[tokio::test]
    async fn failed_readback_surfaces_errors() {
        let runner = ScriptedRunner::new()
            .on("which dig", Scripted::ok("/usr/bin/dig"))
            .on("which", Scripted::exit(1))
            .on("dig +short github.com", Scripted::ok(""))
            .on("curl", Scripted::exit(7))
            .on("sysctl", Scripted::exit(255));

        let report = SettingsReadback::new(&runner).run_all().await;

        // resolution and HTTPS both fail
        assert_eq!(report.error_count(), 2);
        // both tuned keys unreadable
        assert!(report.warning_count() >= 2);
        assert_eq!(runner.calls_matching("curl"), 1);
    }
}
