use anyhow::Result;
use nm_core::profile::{CODE_HOST_NAMES, GITHUB_HOSTS};
use nm_core::{CommandRunner, RegionProfile, CODE_HOST_DOMAIN, CODE_HOST_FALLBACK_IP};
use nm_hosts::{HostsEntry, HostsFile};
use nm_probe::resolve;
use std::time::Duration;

const GIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Rewrite the GitHub hosts-table block with the official addresses.
/// GitHub serves two apex domains, so the rewrite runs once per apex.
pub fn optimize_github(hosts: &mut HostsFile) -> Result<()> {
    println!("\n🐙 Applying GitHub hosts overrides...");
    hosts.backup_once()?;

    for apex in ["github.com", "githubusercontent.com"] {
        let entries: Vec<HostsEntry> = GITHUB_HOSTS
            .iter()
            .filter(|(_, host)| host.ends_with(apex))
            .map(|(ip, host)| HostsEntry::new(*ip, *host))
            .collect();
        hosts.replace_entries(apex, &entries)?;
    }

    println!("  ✅ {} GitHub entries written", GITHUB_HOSTS.len());
    Ok(())
}

/// Resolve the code host freshly and rewrite its hosts entries; on domestic
/// hosts also point GitHub clone URLs at the code host via git config.
pub async fn optimize_code_host<R: CommandRunner>(
    runner: &R,
    profile: &RegionProfile,
    hosts: &mut HostsFile,
) -> Result<()> {
    println!("\n🐉 Applying {} hosts overrides...", CODE_HOST_DOMAIN);

    let resolved = resolve(runner, CODE_HOST_DOMAIN, CODE_HOST_FALLBACK_IP).await;
    println!("  📍 resolved {} to {} (via {:?})", CODE_HOST_DOMAIN, resolved.ip, resolved.source);

    hosts.backup_once()?;
    let entries: Vec<HostsEntry> = CODE_HOST_NAMES
        .iter()
        .map(|host| HostsEntry::new(resolved.ip.clone(), *host))
        .collect();
    hosts.replace_entries(CODE_HOST_DOMAIN, &entries)?;
    println!("  ✅ {} entries written", entries.len());

    if profile.use_code_host_git_mirror {
        configure_git_mirror(runner).await;
    }

    Ok(())
}

async fn configure_git_mirror<R: CommandRunner>(runner: &R) {
    println!("  🔧 configuring git to prefer {} over github.com...", CODE_HOST_DOMAIN);

    let rewrites = [
        ("https://gitee.com/", "https://github.com/"),
        ("https://gitee.com/", "git@github.com:"),
    ];
    for (mirror, upstream) in rewrites {
        let instead_of = format!("url.{}.insteadOf", mirror);
        match runner
            .run(
                "git",
                &["config", "--global", &instead_of, upstream],
                GIT_TIMEOUT,
            )
            .await
        {
            Ok(out) if out.success() => {}
            Ok(out) => println!("    ❌ git config failed: {}", out.stderr.trim()),
            Err(e) => println!("    ❌ git config failed: {}", e),
        }
    }
}
