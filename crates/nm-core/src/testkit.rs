//! Deterministic [`CommandRunner`] for driving the probe, resolution and
//! remediation chains in tests without touching the host.

use crate::runner::{CommandOutput, CommandRunner, RunError};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted response for a matched command line.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Command ran and exited with the given code and stdout.
    Output { exit_code: i32, stdout: String },
    /// Command exceeded its hard timeout.
    Timeout,
    /// Binary does not exist on the host.
    Missing,
}

impl Scripted {
    pub fn ok(stdout: &str) -> Self {
        Scripted::Output {
            exit_code: 0,
            stdout: stdout.to_string(),
        }
    }

    pub fn exit(code: i32) -> Self {
        Scripted::Output {
            exit_code: code,
            stdout: String::new(),
        }
    }
}

struct Rule {
    prefix: String,
    responses: Vec<Scripted>,
    served: usize,
}

/// Matches invocations by command-line prefix, serving scripted responses
/// in order. The last response of a rule repeats once the sequence is
/// exhausted. Unmatched invocations succeed with empty output.
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Respond to every command line starting with `prefix`.
    pub fn on(self, prefix: &str, response: Scripted) -> Self {
        self.on_sequence(prefix, vec![response])
    }

    /// Respond with a sequence; the final entry repeats.
    pub fn on_sequence(self, prefix: &str, responses: Vec<Scripted>) -> Self {
        assert!(!responses.is_empty(), "rule needs at least one response");
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.to_string(),
            responses,
            served: 0,
        });
        self
    }

    /// Every command line seen so far, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Count of invocations whose command line starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line.clone());

        let mut rules = self.rules.lock().unwrap();
        let scripted = match rules.iter_mut().find(|r| line.starts_with(&r.prefix)) {
            Some(rule) => {
                let idx = rule.served.min(rule.responses.len() - 1);
                rule.served += 1;
                rule.responses[idx].clone()
            }
            None => Scripted::ok(""),
        };

        match scripted {
            Scripted::Output { exit_code, stdout } => Ok(CommandOutput {
                exit_code,
                stdout,
                stderr: String::new(),
            }),
            Scripted::Timeout => Err(RunError::Timeout {
                program: program.to_string(),
                limit: timeout,
            }),
            Scripted::Missing => Err(RunError::ToolUnavailable(program.to_string())),
        }
    }
}
