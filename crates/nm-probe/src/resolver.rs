use nm_core::{tool_exists, CommandRunner};
use regex::Regex;
use std::net::Ipv4Addr;
use std::time::Duration;

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Which step of the resolution chain produced an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Dig,
    Nslookup,
    PingHeuristic,
    Fallback,
    DnsOverHttps,
}

/// Address picked for a domain, computed fresh on every call.
#[derive(Debug, Clone)]
pub struct ResolvedAddress {
    pub ip: String,
    pub source: ResolutionSource,
}

/// Resolve `domain` through a fixed priority chain; never fails.
///
/// `dig` wins when present; `nslookup` is consulted only when `dig` is
/// absent; with neither installed the first address-looking token in a
/// single ping's output is used. `fallback_ip` covers the case where the
/// tools exist but return nothing usable.
pub async fn resolve<R: CommandRunner>(
    runner: &R,
    domain: &str,
    fallback_ip: &str,
) -> ResolvedAddress {
    if tool_exists(runner, "dig").await {
        if let Some(ip) = resolve_with_dig(runner, domain).await {
            return ResolvedAddress {
                ip,
                source: ResolutionSource::Dig,
            };
        }
    } else if tool_exists(runner, "nslookup").await {
        if let Some(ip) = resolve_with_nslookup(runner, domain).await {
            return ResolvedAddress {
                ip,
                source: ResolutionSource::Nslookup,
            };
        }
    } else if let Some(ip) = resolve_with_ping(runner, domain).await {
        return ResolvedAddress {
            ip,
            source: ResolutionSource::PingHeuristic,
        };
    }

    tracing::debug!(domain, fallback_ip, "resolution chain exhausted");
    ResolvedAddress {
        ip: fallback_ip.to_string(),
        source: ResolutionSource::Fallback,
    }
}

fn usable(ip: &str) -> bool {
    !ip.is_empty() && ip != "127.0.0.1"
}

async fn resolve_with_dig<R: CommandRunner>(runner: &R, domain: &str) -> Option<String> {
    let out = runner
        .run("dig", &["+short", domain], RESOLVE_TIMEOUT)
        .await
        .ok()?;
    if !out.success() {
        return None;
    }
    // +short may emit CNAMEs before A records; take the first real address.
    out.stdout
        .lines()
        .map(str::trim)
        .find(|l| l.parse::<Ipv4Addr>().is_ok() && usable(l))
        .map(str::to_string)
}

async fn resolve_with_nslookup<R: CommandRunner>(runner: &R, domain: &str) -> Option<String> {
    let out = runner.run("nslookup", &[domain], RESOLVE_TIMEOUT).await.ok()?;
    if !out.success() {
        return None;
    }
    parse_nslookup(&out.stdout)
}

/// Answer addresses appear as `Address: x.x.x.x`; the server line carries a
/// `#port` suffix and is skipped.
fn parse_nslookup(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter(|line| line.contains("Address:") && !line.contains('#'))
        .filter_map(|line| line.split("Address:").last())
        .map(str::trim)
        .find(|ip| ip.parse::<Ipv4Addr>().is_ok() && usable(ip))
        .map(str::to_string)
}

async fn resolve_with_ping<R: CommandRunner>(runner: &R, domain: &str) -> Option<String> {
    let out = runner
        .run("ping", &["-c", "1", domain], RESOLVE_TIMEOUT)
        .await
        .ok()?;
    if !out.success() {
        return None;
    }
    parse_ping(&out.stdout)
}

/// Extract the first parenthesised address from ping's banner, e.g.
/// `PING gitee.com (212.64.62.174) 56(84) bytes of data.`
fn parse_ping(stdout: &str) -> Option<String> {
    let re = Regex::new(r"\((\d{1,3}(?:\.\d{1,3}){3})\)").expect("static pattern");
    re.captures(stdout)
        .map(|c| c[1].to_string())
        .filter(|ip| ip.parse::<Ipv4Addr>().is_ok() && usable(ip))
}
