use anyhow::{Context, Result};
use nm_core::{CommandRunner, RegionProfile};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

const CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Append the profile's nameservers to resolv.conf, restart the resolver
/// cache, then pin the same servers statically in NetworkManager so they
/// survive lease renewals.
pub async fn apply_dns<R: CommandRunner>(
    runner: &R,
    profile: &RegionProfile,
    resolv_conf: &Path,
) -> Result<()> {
    println!("\n🔧 Applying DNS servers...");

    append_nameservers(resolv_conf, profile.dns_servers)
        .with_context(|| format!("failed to update {}", resolv_conf.display()))?;

    match runner
        .run("systemctl", &["restart", "systemd-resolved"], CMD_TIMEOUT)
        .await
    {
        Ok(out) if out.success() => println!("  ✅ restarted systemd-resolved"),
        Ok(out) => println!("  ❌ systemd-resolved restart failed: {}", out.stderr.trim()),
        Err(e) => println!("  ❌ systemd-resolved restart failed: {}", e),
    }

    configure_network_manager(runner, profile.dns_servers).await;
    Ok(())
}

fn append_nameservers(resolv_conf: &Path, servers: &[&str]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(resolv_conf)?;
    for server in servers {
        writeln!(file, "nameserver {}", server)?;
        println!("  ✅ added nameserver {}", server);
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct NmConnection {
    pub uuid: String,
    pub kind: String,
    pub device: String,
}

/// Parse `nmcli -t -f UUID,TYPE,DEVICE connection show --active` output.
pub(crate) fn parse_active_connections(stdout: &str) -> Vec<NmConnection> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ':');
            Some(NmConnection {
                uuid: parts.next()?.to_string(),
                kind: parts.next()?.to_string(),
                device: parts.next()?.to_string(),
            })
        })
        .filter(|c| !c.uuid.is_empty())
        .collect()
}

/// Pin static DNS on every active ethernet/wifi connection. Failures are
/// reported and skipped; DNS pinning is best-effort.
async fn configure_network_manager<R: CommandRunner>(runner: &R, servers: &[&str]) {
    println!("  🔧 pinning DNS in NetworkManager...");

    let listing = match runner
        .run(
            "nmcli",
            &["-t", "-f", "UUID,TYPE,DEVICE", "connection", "show", "--active"],
            CMD_TIMEOUT,
        )
        .await
    {
        Ok(out) if out.success() => out.stdout,
        Ok(_) | Err(_) => {
            println!("  ⚠️  nmcli unavailable, skipping NetworkManager DNS pinning");
            return;
        }
    };

    let dns_list = servers.join(",");

    for conn in parse_active_connections(&listing) {
        if conn.kind != "802-3-ethernet" && conn.kind != "802-11-wireless" {
            continue;
        }
        println!("    configuring {} ({})", conn.device, conn.kind);

        let steps: [&[&str]; 3] = [
            &["connection", "modify", &conn.uuid, "ipv4.dns", &dns_list],
            &["connection", "modify", &conn.uuid, "ipv4.ignore-auto-dns", "yes"],
            &["connection", "up", &conn.uuid],
        ];
        for args in steps {
            match runner.run("nmcli", args, CMD_TIMEOUT).await {
                Ok(out) if out.success() => {}
                Ok(out) => {
                    println!("    ❌ nmcli step failed: {}", out.stderr.trim());
                    tracing::warn!(device = %conn.device, "nmcli step failed");
                }
                Err(e) => println!("    ❌ nmcli step failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_core::testkit::{Scripted, ScriptedRunner};
    use nm_core::{GeoClassification, RegionProfile};

    #[test]
    fn parses_nmcli_terse_output() {
        let out = "uuid-1:802-3-ethernet:eth0\nuuid-2:loopback:lo\nuuid-3:802-11-wireless:wlan0\n";
        let conns = parse_active_connections(out);
        assert_eq!(conns.len(), 3);
        assert_eq!(conns[0].uuid, "uuid-1");
        assert_eq!(conns[2].device, "wlan0");
    }

    #[tokio::test]
    async fn writes_nameservers_and_pins_ethernet_only() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = dir.path().join("resolv.conf");

        let runner = ScriptedRunner::new().on(
            "nmcli -t",
            Scripted::ok("uuid-1:802-3-ethernet:eth0\nuuid-2:loopback:lo\n"),
        );

        let profile = RegionProfile::for_classification(&GeoClassification::overseas_default());
        apply_dns(&runner, &profile, &resolv).await.unwrap();

        let written = std::fs::read_to_string(&resolv).unwrap();
        assert!(written.contains("nameserver 8.8.8.8"));
        assert!(written.contains("nameserver 1.1.1.1"));

        // modify + ignore-auto-dns + up for the one ethernet connection
        assert_eq!(runner.calls_matching("nmcli connection"), 3);
        assert!(runner.calls().iter().any(|c| c.contains("ipv4.ignore-auto-dns yes")));
    }

    #[tokio::test]
    async fn missing_nmcli_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = dir.path().join("resolv.conf");

        let runner = ScriptedRunner::new().on("nmcli", Scripted::Missing);
        let profile = RegionProfile::for_classification(&GeoClassification::overseas_default());

        apply_dns(&runner, &profile, &resolv).await.unwrap();
        assert!(std::fs::read_to_string(&resolv).unwrap().contains("nameserver"));
    }
}
