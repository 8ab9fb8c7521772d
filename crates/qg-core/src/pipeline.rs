//! Staged pipeline
//!
//! Stages run in the order given, each through the full ingest, record and
//! evaluate path. The first blocking verdict halts the pipeline and the
//! remaining reports are neither ingested nor recorded. JSON reports are
//! decoded only when their stage is reached.

use crate::error::{GateError, Result};
use crate::gate::{QualityGate, SubmitMode};
use qg_eval::Verdict;
use qg_report::{RawReport, Stage};
use serde::Serialize;

/// Result of a staged pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    verdicts: Vec<Verdict>,
    skipped: Vec<String>,
}

impl PipelineReport {
    /// Verdicts of the stages that ran, in order
    #[inline]
    #[must_use]
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Reports that were not evaluated: stage names for decoded reports,
    /// caller labels for JSON reports that were never decoded
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Whether every stage passed
    #[must_use]
    pub fn pass(&self) -> bool {
        self.verdicts.iter().all(Verdict::pass)
    }

    /// Stage whose verdict halted the pipeline
    #[must_use]
    pub fn halted_at(&self) -> Option<Stage> {
        self.verdicts
            .iter()
            .find(|v| !v.pass())
            .map(|v| v.run().stage())
    }

    /// Process exit status for CI: 0 pass, 1 fail
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.pass())
    }
}

impl QualityGate {
    /// Run `reports` as consecutive stages
    ///
    /// # Errors
    /// Returns [`GateError::EmptyPipeline`] for an empty list and
    /// [`GateError::MalformedReport`] if a stage that is reached fails
    /// ingestion. Earlier stages stay recorded in that case.
    pub fn run_pipeline(
        &self,
        reports: impl IntoIterator<Item = RawReport>,
        mode: SubmitMode,
    ) -> Result<PipelineReport> {
        self.run_stages(reports, |raw| self.submit(raw, mode), |raw| raw.stage)
    }

    /// Run labelled JSON reports as consecutive stages.
    ///
    /// Each report is decoded when its stage is reached, so a malformed
    /// report after a blocking stage is skipped rather than rejected.
    /// Skipped reports are listed by label.
    ///
    /// # Errors
    /// As [`Self::run_pipeline`].
    pub fn run_pipeline_json<'a>(
        &self,
        reports: impl IntoIterator<Item = (&'a str, &'a str)>,
        mode: SubmitMode,
    ) -> Result<PipelineReport> {
        self.run_stages(
            reports,
            |(label, json)| {
                self.submit_json(json, mode).map_err(|err| {
                    tracing::warn!(report = label, error = %err, "Stage report rejected");
                    err
                })
            },
            |(label, _)| label.to_string(),
        )
    }

    fn run_stages<T>(
        &self,
        reports: impl IntoIterator<Item = T>,
        submit: impl Fn(T) -> Result<Verdict>,
        name: impl Fn(T) -> String,
    ) -> Result<PipelineReport> {
        let mut reports = reports.into_iter().peekable();
        if reports.peek().is_none() {
            return Err(GateError::EmptyPipeline);
        }

        let mut verdicts = Vec::new();
        while let Some(report) = reports.next() {
            let verdict = submit(report)?;
            let pass = verdict.pass();
            let stage = verdict.run().stage();
            verdicts.push(verdict);

            if !pass {
                let skipped: Vec<String> = reports.map(&name).collect();
                tracing::info!(%stage, skipped = skipped.len(), "Pipeline halted");
                return Ok(PipelineReport { verdicts, skipped });
            }
        }

        tracing::info!(stages = verdicts.len(), "Pipeline passed");
        Ok(PipelineReport {
            verdicts,
            skipped: Vec::new(),
        })
    }
}
