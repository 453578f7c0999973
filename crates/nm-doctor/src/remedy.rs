use nm_core::profile::CODE_HOST_NAMES;
use nm_core::{CommandRunner, CODE_HOST_DOMAIN, CODE_HOST_FALLBACK_IP};
use nm_hosts::{HostsEntry, HostsFile};
use nm_probe::{probe, resolve, ProbeConfig, ResolutionSource, ResolvedAddress};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FIX_TIMEOUT: Duration = Duration::from_secs(120);

const DOH_ENDPOINTS: &[&str] = &[
    "https://dns.google/resolve",
    "https://cloudflare-dns.com/dns-query",
    "https://1.1.1.1/dns-query",
];

/// What a remediation pass actually accomplished. Informational only; the
/// pass itself is never retried.
#[derive(Debug, Clone, Default)]
pub struct RemediationOutcome {
    pub cache_flushed: bool,
    pub tools_installed: bool,
    pub hosts_updated: bool,
    pub reprobe_succeeded: bool,
}

/// Automated, mutating fix attempt: flush the resolver cache, install the
/// missing lookup tools, rewrite the code host's hosts entries with a fresh
/// address, and re-probe with a reduced budget. DNS-over-HTTPS resolvers
/// are consulted only after the local chain plus one re-probe failed.
pub struct RemediationEngine<'a, R> {
    runner: &'a R,
    hosts_path: PathBuf,
    /// Online DoH fallback; `None` disables it for offline use.
    http: Option<reqwest::Client>,
    reprobe: ProbeConfig,
}

impl<'a, R: CommandRunner> RemediationEngine<'a, R> {
    pub fn new(runner: &'a R, http: reqwest::Client) -> Self {
        Self {
            runner,
            hosts_path: PathBuf::from(nm_hosts::SYSTEM_HOSTS_PATH),
            http: Some(http),
            reprobe: ProbeConfig::reprobe(),
        }
    }

    /// Engine without the online DoH fallback.
    pub fn offline(runner: &'a R) -> Self {
        Self {
            runner,
            hosts_path: PathBuf::from(nm_hosts::SYSTEM_HOSTS_PATH),
            http: None,
            reprobe: ProbeConfig::reprobe(),
        }
    }

    pub fn with_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_path = path.into();
        self
    }

    pub fn with_reprobe_config(mut self, cfg: ProbeConfig) -> Self {
        self.reprobe = cfg;
        self
    }

    pub async fn remediate(&self, domain: &str) -> RemediationOutcome {
        let mut outcome = RemediationOutcome::default();
        let mut hosts = HostsFile::new(&self.hosts_path);

        println!("\n🔧 Attempting automated fixes...");

        println!("  flushing resolver caches...");
        outcome.cache_flushed = self.flush_dns_cache().await;

        println!("  installing missing diagnostic tools...");
        outcome.tools_installed = self.install_tools().await;

        println!("  refreshing {} hosts entries...", domain);
        let resolved = resolve(self.runner, domain, CODE_HOST_FALLBACK_IP).await;
        println!("    resolved to {} (via {:?})", resolved.ip, resolved.source);
        outcome.hosts_updated = self.rewrite_hosts(&mut hosts, domain, &resolved);

        println!("  re-probing {}...", domain);
        outcome.reprobe_succeeded = probe(self.runner, domain, None, &self.reprobe)
            .await
            .succeeded;

        if !outcome.reprobe_succeeded {
            println!("  local fix insufficient, consulting online DNS resolvers...");
            if let Some(ip) = self.doh_lookup(domain).await {
                println!("    online resolvers report {}", ip);
                let online = ResolvedAddress {
                    ip,
                    source: ResolutionSource::DnsOverHttps,
                };
                outcome.hosts_updated = self.rewrite_hosts(&mut hosts, domain, &online);
                outcome.reprobe_succeeded = probe(self.runner, domain, None, &self.reprobe)
                    .await
                    .succeeded;
            } else {
                println!("    no online resolver returned a usable address");
            }
        }

        if outcome.reprobe_succeeded {
            println!("  ✅ automated fix verified");
        } else {
            println!("  ❌ automated fixes exhausted");
        }

        outcome
    }

    async fn flush_dns_cache(&self) -> bool {
        let resolved = self
            .run_ok("systemctl", &["restart", "systemd-resolved"])
            .await;
        let nscd = self.run_ok("nscd", &["-i", "hosts"]).await;
        resolved || nscd
    }

    /// Install the lookup/diagnostic tools with whichever package manager
    /// family this host belongs to.
    async fn install_tools(&self) -> bool {
        if Path::new("/etc/debian_version").exists() {
            self.run_ok("apt", &["update"]).await;
            self.run_ok(
                "apt",
                &["install", "-y", "dnsutils", "net-tools", "curl", "wget"],
            )
            .await
        } else if Path::new("/etc/redhat-release").exists() {
            let pm = if nm_core::tool_exists(self.runner, "dnf").await {
                "dnf"
            } else {
                "yum"
            };
            self.run_ok(
                pm,
                &["install", "-y", "bind-utils", "net-tools", "curl", "wget"],
            )
            .await
        } else {
            println!("    unknown distribution family, skipping tool install");
            false
        }
    }

    /// Hosts failures are reported and remediation continues degraded.
    fn rewrite_hosts(&self, hosts: &mut HostsFile, domain: &str, addr: &ResolvedAddress) -> bool {
        if let Err(e) = hosts.backup_once() {
            println!("    ⚠️  could not back up hosts file: {:#}", e);
        }

        let entries: Vec<HostsEntry> = hostname_set(domain)
            .into_iter()
            .map(|host| HostsEntry::new(addr.ip.clone(), host))
            .collect();

        match hosts.replace_entries(domain, &entries) {
            Ok(()) => true,
            Err(e) => {
                println!("    ❌ hosts update failed: {:#}", e);
                tracing::warn!(error = %e, "hosts update failed");
                false
            }
        }
    }

    async fn doh_lookup(&self, domain: &str) -> Option<String> {
        let client = self.http.as_ref()?;

        for endpoint in DOH_ENDPOINTS {
            let response = client
                .get(*endpoint)
                .query(&[("name", domain), ("type", "A")])
                .header("accept", "application/dns-json")
                .timeout(Duration::from_secs(10))
                .send()
                .await;

            let Ok(resp) = response else { continue };
            if !resp.status().is_success() {
                continue;
            }
            let Ok(body) = resp.text().await else { continue };
            if let Some(ip) = first_answer(&body) {
                return Some(ip);
            }
        }
        None
    }

    async fn run_ok(&self, program: &str, args: &[&str]) -> bool {
        match self.runner.run(program, args, FIX_TIMEOUT).await {
            Ok(out) if out.success() => true,
            Ok(out) => {
                tracing::debug!(program, code = out.exit_code, "fix command failed");
                false
            }
            Err(e) => {
                tracing::debug!(program, error = %e, "fix command unavailable");
                false
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DnsJsonAnswer {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct DnsJsonResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsJsonAnswer>,
}

/// Hostnames rewritten for a remediated domain. The code host's sibling
/// service hostnames share one address; for any other domain only the apex
/// is asserted.
fn hostname_set(domain: &str) -> Vec<String> {
    if domain == CODE_HOST_DOMAIN {
        CODE_HOST_NAMES.iter().map(|h| h.to_string()).collect()
    } else {
        vec![domain.to_string()]
    }
}

/// First usable address from a DNS-JSON response body.
fn first_answer(body: &str) -> Option<String> {
    let parsed: DnsJsonResponse = serde_json::from_str(body).ok()?;
    parsed
        .answer
        .into_iter()
        .map(|a| a.data)
        .find(|ip| !ip.is_empty() && ip != "127.0.0.1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_core::testkit::{Scripted, ScriptedRunner};
    use std::io::Write;

    fn temp_hosts() -> (tempfile::NamedTempFile, PathBuf) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"127.0.0.1 localhost\n").unwrap();
        let path = file.path().to_path_buf();
        (file, path)
    }

    fn fast_reprobe() -> ProbeConfig {
        ProbeConfig::reprobe().with_retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn successful_reprobe_sets_all_flags() {
        let (_guard, hosts_path) = temp_hosts();
        let runner = ScriptedRunner::new()
            .on("which dig", Scripted::ok("/usr/bin/dig"))
            .on("dig +short gitee.com", Scripted::ok("180.76.198.77\n"))
            .on("curl", Scripted::ok("HTTP/2 200"));

        let engine = RemediationEngine::offline(&runner)
            .with_hosts_path(&hosts_path)
            .with_reprobe_config(fast_reprobe());
        let outcome = engine.remediate("gitee.com").await;

        assert!(outcome.cache_flushed);
        assert!(outcome.hosts_updated);
        assert!(outcome.reprobe_succeeded);

        let content = std::fs::read_to_string(&hosts_path).unwrap();
        assert!(content.contains("180.76.198.77 gitee.com"));
        assert!(content.contains("180.76.198.77 api.gitee.com"));
    }

    #[tokio::test]
    async fn reprobe_uses_reduced_budget() {
        let (_guard, hosts_path) = temp_hosts();
        let runner = ScriptedRunner::new()
            .on("which", Scripted::exit(1))
            .on("ping", Scripted::exit(2))
            .on("curl", Scripted::exit(7));

        let engine = RemediationEngine::offline(&runner)
            .with_hosts_path(&hosts_path)
            .with_reprobe_config(fast_reprobe());
        let outcome = engine.remediate("gitee.com").await;

        assert!(!outcome.reprobe_succeeded);
        // offline engine: exactly one re-probe pass of 3 attempts
        assert_eq!(runner.calls_matching("curl"), 3);
        // fallback address landed in the hosts file regardless
        let content = std::fs::read_to_string(&hosts_path).unwrap();
        assert!(content.contains("212.64.62.174 gitee.com"));
    }

    #[tokio::test]
    async fn non_default_domain_rewrites_its_own_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"127.0.0.1 localhost\n1.1.1.1 example.com\n")
            .unwrap();
        let path = file.path().to_path_buf();

        let runner = ScriptedRunner::new()
            .on("which dig", Scripted::ok("/usr/bin/dig"))
            .on("which", Scripted::exit(1))
            .on("dig +short example.com", Scripted::ok("9.9.9.9\n"))
            .on("curl", Scripted::ok("HTTP/2 200"));

        let engine = RemediationEngine::offline(&runner)
            .with_hosts_path(&path)
            .with_reprobe_config(fast_reprobe());
        let outcome = engine.remediate("example.com").await;

        assert!(outcome.hosts_updated);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("9.9.9.9 example.com"));
        assert!(content.contains("127.0.0.1 localhost"));
        // no code-host entries leak into an unrelated domain's fix
        assert!(!content.contains("gitee"));

        // a second pass converges instead of stacking duplicates
        engine.remediate("example.com").await;
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("example.com").count(), 1);
    }

    #[tokio::test]
    async fn unwritable_hosts_reports_degraded_outcome() {
        let runner = ScriptedRunner::new()
            .on("which", Scripted::exit(1))
            .on("ping", Scripted::exit(2))
            .on("curl", Scripted::ok("HTTP/2 200"));

        let engine = RemediationEngine::offline(&runner)
            .with_hosts_path("/nonexistent/netmend-remedy-test")
            .with_reprobe_config(fast_reprobe());
        let outcome = engine.remediate("gitee.com").await;

        assert!(!outcome.hosts_updated);
        assert!(outcome.reprobe_succeeded);
    }

    #[test]
    fn parses_dns_json_answers() {
        let body = r#"{"Status":0,"Answer":[{"name":"gitee.com","type":1,"TTL":300,"data":"180.76.198.77"}]}"#;
        assert_eq!(first_answer(body).as_deref(), Some("180.76.198.77"));
    }

    #[test]
    fn skips_loopback_and_empty_answers() {
        let body = r#"{"Answer":[{"data":"127.0.0.1"},{"data":""},{"data":"1.2.3.4"}]}"#;
        assert_eq!(first_answer(body).as_deref(), Some("1.2.3.4"));
        assert_eq!(first_answer(r#"{"Status":2}"#), None);
    }
}
