//! Hosts-table mutation with timestamped backups.
//!
//! The hosts file is a flat list of `IP hostname...` lines consulted before
//! DNS. Mutation is a filtered rewrite: stale lines for a domain are dropped,
//! everything else keeps its order, and fresh entries are appended.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SYSTEM_HOSTS_PATH: &str = "/etc/hosts";

/// One hostname override destined for the hosts table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostsEntry {
    pub ip: String,
    pub hostname: String,
}

impl HostsEntry {
    pub fn new(ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            hostname: hostname.into(),
        }
    }

    fn as_line(&self) -> String {
        format!("{} {}", self.ip, self.hostname)
    }
}

/// Handle on a hosts file. Takes at most one backup per instance, so a
/// remediation pass that rewrites entries several times still leaves a
/// single pre-mutation snapshot behind.
pub struct HostsFile {
    path: PathBuf,
    backed_up: bool,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backed_up: false,
        }
    }

    pub fn system() -> Self {
        Self::new(SYSTEM_HOSTS_PATH)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the file to `<path>.backup.<unix-epoch>` before the first
    /// mutation. Later calls on the same instance are no-ops.
    pub fn backup_once(&mut self) -> Result<Option<PathBuf>> {
        if self.backed_up || !self.path.exists() {
            return Ok(None);
        }

        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".backup.{}", epoch));
        let backup = PathBuf::from(name);
        std::fs::copy(&self.path, &backup)
            .with_context(|| format!("failed to back up {} to {}", self.path.display(), backup.display()))?;

        tracing::debug!(backup = %backup.display(), "hosts file backed up");
        self.backed_up = true;
        Ok(Some(backup))
    }

    /// Drop every active entry whose hostname equals `domain` or a
    /// subdomain of it, then append `entries` in order.
    ///
    /// Matching is on the hostname columns, not the raw line: comments and
    /// unrelated hosts that merely mention the domain as a substring are
    /// left alone. Applying this twice converges on the second call's
    /// entries.
    pub fn replace_entries(&mut self, domain: &str, entries: &[HostsEntry]) -> Result<()> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let mut kept: Vec<&str> = content
            .lines()
            .filter(|line| !line_names_domain(line, domain))
            .collect();

        // Trim trailing blank lines so repeated rewrites do not grow the file.
        while kept.last().is_some_and(|l| l.trim().is_empty()) {
            kept.pop();
        }

        let mut out = kept.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        for entry in entries {
            out.push_str(&entry.as_line());
            out.push('\n');
        }

        std::fs::write(&self.path, out)
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        tracing::debug!(domain, count = entries.len(), "hosts entries replaced");
        Ok(())
    }

    /// Active entries whose hostname matches `domain` or a subdomain.
    pub fn entries_for(&self, domain: &str) -> Result<Vec<HostsEntry>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let mut entries = Vec::new();
        for line in content.lines() {
            let active = line.split('#').next().unwrap_or("");
            let mut fields = active.split_whitespace();
            let Some(ip) = fields.next() else { continue };
            for host in fields {
                if host_matches(host, domain) {
                    entries.push(HostsEntry::new(ip, host));
                }
            }
        }
        Ok(entries)
    }
}

/// True when any hostname column of the active (non-comment) part of the
/// line equals the domain or ends with `.domain`.
fn line_names_domain(line: &str, domain: &str) -> bool {
    let active = line.split('#').next().unwrap_or("");
    let mut fields = active.split_whitespace();
    let Some(_ip) = fields.next() else {
        return false;
    };
    fields.any(|host| host_matches(host, domain))
}

fn host_matches(host: &str, domain: &str) -> bool {
    host.eq_ignore_ascii_case(domain)
        || host
            .to_ascii_lowercase()
            .strip_suffix(&domain.to_ascii_lowercase())
            .is_some_and(|prefix| prefix.ends_with('.'))
}
