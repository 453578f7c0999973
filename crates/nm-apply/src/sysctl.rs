use anyhow::{Context, Result};
use nm_core::profile::SYSCTL_TUNING;
use nm_core::CommandRunner;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Append the TCP tuning keys to sysctl.conf and apply them. Keys already
/// present are not appended again, so repeated runs do not grow the file.
pub async fn apply_sysctl_tuning<R: CommandRunner>(runner: &R, sysctl_conf: &Path) -> Result<()> {
    println!("\n🌐 Applying TCP tuning...");

    let existing = std::fs::read_to_string(sysctl_conf).unwrap_or_default();

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(sysctl_conf)
        .with_context(|| format!("failed to open {}", sysctl_conf.display()))?;

    let mut added = 0;
    for (key, value) in SYSCTL_TUNING {
        if existing.lines().any(|l| l.trim_start().starts_with(key)) {
            continue;
        }
        writeln!(file, "{} = {}", key, value)?;
        added += 1;
    }
    println!("  ✅ {} tuning key(s) appended", added);

    match runner.run("sysctl", &["-p"], Duration::from_secs(30)).await {
        Ok(out) if out.success() => println!("  ✅ sysctl settings applied"),
        Ok(out) => println!("  ⚠️  sysctl -p failed: {}", out.stderr.trim()),
        Err(e) => println!("  ⚠️  sysctl -p failed: {}", e),
    }

    Ok(())
}
