//! Gate verdicts

use crate::reason::Reason;
use qg_report::{RunId, RunRecord, RunSummary, Stage};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Outcome of one gate evaluation
///
/// `pass` always agrees with the reasons, so a verdict can only be built by
/// [`Verdict::new`], never decoded:
///
/// ```compile_fail
/// let verdict: qg_eval::Verdict =
///     serde_json::from_str(r#"{"pass": true, "reasons": [], "run": {}}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pass: bool,
    reasons: Vec<Reason>,
    run: RunRecord,
}

impl Verdict {
    /// Build a verdict; it passes iff no reason is blocking
    #[must_use]
    pub fn new(run: RunRecord, reasons: Vec<Reason>) -> Self {
        let pass = !reasons.iter().any(Reason::is_blocking);
        Self { pass, reasons, run }
    }

    /// Whether the gate passed
    #[inline]
    #[must_use]
    pub fn pass(&self) -> bool {
        self.pass
    }

    /// All reasons in rule order
    #[inline]
    #[must_use]
    pub fn reasons(&self) -> &[Reason] {
        &self.reasons
    }

    /// The run this verdict was computed from
    #[inline]
    #[must_use]
    pub fn run(&self) -> &RunRecord {
        &self.run
    }

    /// Reasons that failed the gate
    pub fn blocking_reasons(&self) -> impl Iterator<Item = &Reason> {
        self.reasons.iter().filter(|r| r.is_blocking())
    }

    /// Reasons reported for information only
    pub fn advisories(&self) -> impl Iterator<Item = &Reason> {
        self.reasons.iter().filter(|r| !r.is_blocking())
    }

    /// Reasons rendered as text
    #[must_use]
    pub fn reason_strings(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }

    /// Process exit status for CI: 0 pass, 1 fail
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.pass)
    }

    /// Flat summary for CI output
    #[must_use]
    pub fn report(&self) -> VerdictReport {
        VerdictReport {
            pass: self.pass,
            stage: self.run.stage(),
            run_id: self.run.id(),
            partial: self.run.is_partial(),
            summary: self.run.summary(),
            coverage: self.run.coverage(),
            blocking: self.blocking_reasons().map(ToString::to_string).collect(),
            advisories: self.advisories().map(ToString::to_string).collect(),
        }
    }

    /// Human-readable multi-line rendering
    #[must_use]
    pub fn render_text(&self) -> String {
        let summary = self.run.summary();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} gate: {}",
            self.run.stage(),
            if self.pass { "PASS" } else { "FAIL" }
        );
        let _ = writeln!(
            out,
            "  tests: {} passed, {} failed, {} skipped{}",
            summary.passed,
            summary.failed,
            summary.skipped,
            if self.run.is_partial() { " (partial)" } else { "" }
        );
        match self.run.coverage() {
            Some(c) => {
                let _ = writeln!(out, "  coverage: {c}%");
            }
            None => {
                let _ = writeln!(out, "  coverage: not measured");
            }
        }
        for reason in &self.reasons {
            let marker = if reason.is_blocking() { "x" } else { "!" };
            let _ = writeln!(out, "  [{marker}] {reason}");
        }
        out
    }
}

/// Serializable verdict summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictReport {
    /// Whether the gate passed
    pub pass: bool,
    /// Evaluated stage
    pub stage: Stage,
    /// Evaluated run
    pub run_id: RunId,
    /// Whether the run was partial
    pub partial: bool,
    /// Outcome counts
    pub summary: RunSummary,
    /// Measured coverage
    pub coverage: Option<f64>,
    /// Blocking reasons
    pub blocking: Vec<String>,
    /// Advisory reasons
    pub advisories: Vec<String>,
}
