use nm_core::{CommandRunner, RunError};
use std::time::{Duration, SystemTime};

/// Probe budgets and timeouts. The retry delay is a fixed pause, not a
/// backoff schedule. Connect and total timeouts are passed to curl with
/// whole-second granularity; sub-second values round up to one second.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub max_attempts: u32,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    /// Hard cap enforced by us on top of curl's own timeouts, guarding
    /// against a hung process.
    pub hard_timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            connect_timeout: Duration::from_secs(5),
            total_timeout: Duration::from_secs(10),
            hard_timeout: Duration::from_secs(15),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl ProbeConfig {
    /// Reduced budget used when re-checking after a remediation attempt.
    pub fn reprobe() -> Self {
        Self {
            max_attempts: 3,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
    Timeout,
}

/// One bounded attempt to reach the target. Created per attempt, kept only
/// for the run's diagnostics.
#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    pub index: u32,
    pub target: String,
    pub started_at: SystemTime,
    pub outcome: AttemptOutcome,
    pub raw_diagnostic: String,
}

/// Aggregate of one probe run, immutable once the loop ends.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub attempts: Vec<ProbeAttempt>,
    pub succeeded: bool,
}

impl ProbeResult {
    pub fn attempts_made(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Try to reach `https://<target>` up to `cfg.max_attempts` times, stopping
/// at the first success. With `host_override` set, `target` is a literal
/// address and the override is forced as the virtual host.
///
/// Never fails: runner errors become recorded attempt outcomes. No side
/// effects beyond the network call itself.
pub async fn probe<R: CommandRunner>(
    runner: &R,
    target: &str,
    host_override: Option<&str>,
    cfg: &ProbeConfig,
) -> ProbeResult {
    let url = format!("https://{}", target);
    // curl treats a timeout of 0 as unlimited, so never pass less than 1
    let connect = cfg.connect_timeout.as_secs().max(1).to_string();
    let total = cfg.total_timeout.as_secs().max(1).to_string();

    let mut args: Vec<String> = vec![
        "-I".into(),
        "--connect-timeout".into(),
        connect,
        "--max-time".into(),
        total,
    ];
    if let Some(host) = host_override {
        args.push("-H".into());
        args.push(format!("Host: {}", host));
    }
    args.push(url);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

    let mut attempts = Vec::new();

    for index in 1..=cfg.max_attempts {
        println!("  attempt {}/{}...", index, cfg.max_attempts);
        let started_at = SystemTime::now();

        let (outcome, raw) = match runner.run("curl", &arg_refs, cfg.hard_timeout).await {
            Ok(out) if out.success() => (AttemptOutcome::Success, out.stdout),
            Ok(out) => (
                AttemptOutcome::Failure(format!("curl exited with code {}", out.exit_code)),
                out.stderr,
            ),
            Err(RunError::Timeout { .. }) => (AttemptOutcome::Timeout, String::new()),
            Err(e) => (AttemptOutcome::Failure(e.to_string()), String::new()),
        };

        let succeeded = outcome == AttemptOutcome::Success;
        attempts.push(ProbeAttempt {
            index,
            target: target.to_string(),
            started_at,
            outcome,
            raw_diagnostic: raw,
        });

        if succeeded {
            println!("  ✅ reachable on attempt {}", index);
            return ProbeResult {
                attempts,
                succeeded: true,
            };
        }

        tracing::debug!(target, index, "probe attempt failed");
        if index < cfg.max_attempts {
            println!("  waiting {:?} before retry...", cfg.retry_delay);
            tokio::time::sleep(cfg.retry_delay).await;
        }
    }

    println!("  ❌ unreachable after {} attempt(s)", cfg.max_attempts);
    ProbeResult {
        attempts,
        succeeded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_core::testkit::{Scripted, ScriptedRunner};

    fn fast(max_attempts: u32) -> ProbeConfig {
        ProbeConfig::default()
            .with_max_attempts(max_attempts)
            .with_retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn exhausts_budget_when_always_failing() {
        let runner = ScriptedRunner::new().on("curl", Scripted::exit(7));

        let result = probe(&runner, "gitee.com", None, &fast(5)).await;

        assert!(!result.succeeded);
        assert_eq!(result.attempts_made(), 5);
        assert_eq!(runner.calls_matching("curl"), 5);
        assert!(result
            .attempts
            .iter()
            .all(|a| matches!(a.outcome, AttemptOutcome::Failure(_))));
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let runner = ScriptedRunner::new().on_sequence(
            "curl",
            vec![Scripted::exit(7), Scripted::exit(28), Scripted::ok("HTTP/2 200")],
        );

        let result = probe(&runner, "gitee.com", None, &fast(5)).await;

        assert!(result.succeeded);
        assert_eq!(result.attempts_made(), 3);
        assert_eq!(runner.calls_matching("curl"), 3);
        assert_eq!(result.attempts[2].outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn hard_timeout_recorded_and_retried() {
        let runner = ScriptedRunner::new()
            .on_sequence("curl", vec![Scripted::Timeout, Scripted::ok("HTTP/2 200")]);

        let result = probe(&runner, "gitee.com", None, &fast(5)).await;

        assert!(result.succeeded);
        assert_eq!(result.attempts[0].outcome, AttemptOutcome::Timeout);
        assert_eq!(result.attempts_made(), 2);
    }

    #[tokio::test]
    async fn sub_second_timeouts_round_up_for_curl() {
        let runner = ScriptedRunner::new().on("curl", Scripted::ok("HTTP/2 200"));
        let cfg = ProbeConfig {
            connect_timeout: Duration::from_millis(250),
            total_timeout: Duration::from_millis(500),
            ..fast(1)
        };

        let result = probe(&runner, "gitee.com", None, &cfg).await;

        assert!(result.succeeded);
        let calls = runner.calls();
        assert!(calls[0].contains("--connect-timeout 1"));
        assert!(calls[0].contains("--max-time 1"));
    }

    #[tokio::test]
    async fn ip_probe_forces_virtual_host() {
        let runner = ScriptedRunner::new().on("curl", Scripted::ok("HTTP/2 200"));

        let result = probe(&runner, "212.64.62.174", Some("gitee.com"), &fast(5)).await;

        assert!(result.succeeded);
        let calls = runner.calls();
        assert!(calls[0].contains("-H Host: gitee.com"));
        assert!(calls[0].contains("https://212.64.62.174"));
    }
}
