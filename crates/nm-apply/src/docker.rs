use anyhow::{Context, Result};
use nm_core::{CommandRunner, RegionProfile};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct LogOpts {
    #[serde(rename = "max-size")]
    max_size: &'static str,
    #[serde(rename = "max-file")]
    max_file: &'static str,
}

#[derive(Debug, Serialize)]
struct DaemonConfig<'a> {
    #[serde(rename = "registry-mirrors")]
    registry_mirrors: &'a [&'a str],
    #[serde(rename = "log-driver")]
    log_driver: &'static str,
    #[serde(rename = "log-opts")]
    log_opts: LogOpts,
}

pub(crate) fn render_daemon_config(mirrors: &[&str]) -> Result<String> {
    let config = DaemonConfig {
        registry_mirrors: mirrors,
        log_driver: "json-file",
        log_opts: LogOpts {
            max_size: "10m",
            max_file: "3",
        },
    };
    serde_json::to_string_pretty(&config).context("failed to render daemon.json")
}

/// Write the region's registry mirrors into the Docker daemon config and
/// restart the daemon. A failed restart is reported, not fatal — Docker may
/// simply not be installed.
pub async fn apply_docker_mirrors<R: CommandRunner>(
    runner: &R,
    profile: &RegionProfile,
    daemon_json: &Path,
) -> Result<()> {
    println!("\n🐳 Applying Docker registry mirrors...");

    if let Some(parent) = daemon_json.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let rendered = render_daemon_config(profile.docker_mirrors)?;
    std::fs::write(daemon_json, rendered)
        .with_context(|| format!("failed to write {}", daemon_json.display()))?;
    println!("  ✅ wrote {}", daemon_json.display());

    match runner
        .run("systemctl", &["restart", "docker"], Duration::from_secs(60))
        .await
    {
        Ok(out) if out.success() => println!("  ✅ restarted docker"),
        Ok(out) => println!("  ⚠️  docker restart failed: {}", out.stderr.trim()),
        Err(e) => println!("  ⚠️  docker restart failed: {}", e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_core::testkit::ScriptedRunner;
    use nm_core::GeoClassification;

    #[test]
    fn renders_valid_daemon_json() {
        let rendered = render_daemon_config(&["https://registry-1.docker.io"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(
            parsed["registry-mirrors"][0],
            "https://registry-1.docker.io"
        );
        assert_eq!(parsed["log-opts"]["max-size"], "10m");
    }

    #[tokio::test]
    async fn writes_config_and_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker").join("daemon.json");

        let runner = ScriptedRunner::new();
        let profile = RegionProfile::for_classification(&GeoClassification::overseas_default());

        apply_docker_mirrors(&runner, &profile, &path).await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["log-driver"], "json-file");
        assert_eq!(runner.calls_matching("systemctl restart docker"), 1);
    }
}
