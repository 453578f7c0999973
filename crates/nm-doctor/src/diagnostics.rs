use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CheckLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (symbol, name) = match self {
            CheckLevel::Info => ("ℹ️", "INFO"),
            CheckLevel::Warning => ("⚠️", "WARN"),
            CheckLevel::Error => ("❌", "ERROR"),
        };
        write!(f, "{} {}", symbol, name)
    }
}

/// One read-only finding from the diagnostic tree. Findings are reported,
/// never branched on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFinding {
    pub level: CheckLevel,
    pub title: String,
    pub details: String,
    pub suggestion: Option<String>,
}

impl CheckFinding {
    pub fn new(level: CheckLevel, title: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            details: details.into(),
            suggestion: None,
        }
    }

    pub fn info(title: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(CheckLevel::Info, title, details)
    }

    pub fn warning(title: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(CheckLevel::Warning, title, details)
    }

    pub fn error(title: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(CheckLevel::Error, title, details)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn display(&self) {
        println!("\n{} {}", self.level, self.title);
        println!("  {}", self.details);
        if let Some(suggestion) = &self.suggestion {
            println!("  💡 {}", suggestion);
        }
    }
}

/// Sectioned collection of findings for one troubleshooting pass.
#[derive(Debug, Default)]
pub struct TroubleshootReport {
    sections: Vec<(String, Vec<CheckFinding>)>,
}

impl TroubleshootReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_section(&mut self, name: impl Into<String>, findings: Vec<CheckFinding>) {
        self.sections.push((name.into(), findings));
    }

    pub fn error_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|(_, f)| f.iter())
            .filter(|f| f.level >= CheckLevel::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|(_, f)| f.iter())
            .filter(|f| f.level == CheckLevel::Warning)
            .count()
    }

    pub fn display(&self) {
        println!("\n━━━ netmend troubleshooting report ━━━");

        for (name, findings) in &self.sections {
            if findings.is_empty() {
                continue;
            }
            println!("\n── {} ──", name);
            for finding in findings {
                finding.display();
            }
        }

        println!("\n── summary ──");
        let errors = self.error_count();
        let warnings = self.warning_count();
        if errors > 0 {
            println!("  ❌ {} error(s) found", errors);
        }
        if warnings > 0 {
            println!("  ⚠️  {} warning(s) found", warnings);
        }
        if errors == 0 && warnings == 0 {
            println!("  ✅ all checks passed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_level() {
        let mut report = TroubleshootReport::new();
        report.add_section(
            "connectivity",
            vec![
                CheckFinding::info("ok", "fine"),
                CheckFinding::error("down", "no route"),
            ],
        );
        report.add_section(
            "dns",
            vec![CheckFinding::warning("slow", "lookup took long")],
        );

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
    }
}
