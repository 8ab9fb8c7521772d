//! Subcommand execution
//!
//! Each run loads configuration and flake history, executes one
//! subcommand, prints its result, then saves history back. A dry run only
//! saves when it expired a quarantine, so the expiry escalates once.

use crate::cli::{command, LogFormat};
use crate::logging;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use qg_core::{QualityGate, QualityGateConfig, StateStore, SubmitMode};
use qg_flake::{CollectingSink, FlakeTracker, QuarantineRequest};
use qg_report::RawReport;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Exit status: gate passed or command succeeded
pub const EXIT_PASS: i32 = 0;
/// Exit status: gate failed
pub const EXIT_FAIL: i32 = 1;
/// Exit status: malformed input or operational error
pub const EXIT_ERROR: i32 = 2;

/// Parse `args` and run the selected subcommand
///
/// # Errors
/// Returns any error that prevented a verdict or an administrative action.
pub fn run<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = match command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return Ok(if e.use_stderr() { EXIT_ERROR } else { EXIT_PASS });
        }
    };
    let format = matches
        .get_one::<LogFormat>("log-format")
        .copied()
        .unwrap_or(LogFormat::Text);
    logging::init(format);

    let session = Session::open(&matches)?;
    let Some((name, args)) = matches.subcommand() else {
        anyhow::bail!("no subcommand given");
    };

    let (code, persist) = match name {
        "evaluate" => session.evaluate(args)?,
        "pipeline" => session.pipeline(args)?,
        "quarantine" => (session.quarantine(args)?, true),
        "release" => (session.release(args)?, true),
        "sweep" => (session.sweep(args)?, true),
        "status" => (session.status(args)?, true),
        other => anyhow::bail!("unknown subcommand {other}"),
    };

    let escalated = session.report_escalations();
    if persist || escalated > 0 {
        session.save()?;
    }
    Ok(code)
}

/// Loaded configuration, history and escalation buffer for one invocation
struct Session {
    gate: QualityGate,
    store: StateStore,
    sink: Arc<CollectingSink>,
}

impl Session {
    fn open(matches: &ArgMatches) -> Result<Self> {
        let config = match matches.get_one::<PathBuf>("config") {
            Some(path) => QualityGateConfig::load(path)?,
            None => QualityGateConfig::default(),
        };

        let sink = Arc::new(CollectingSink::new());
        let tracker = FlakeTracker::new(config.tracker).with_sink(sink.clone());
        let gate = QualityGate::with_tracker(config.gate, Arc::new(tracker))?;

        let state_path = matches
            .get_one::<PathBuf>("state")
            .context("state path missing")?;
        let store = StateStore::new(state_path);
        gate.load_state(store.load()?);

        Ok(Self { gate, store, sink })
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.gate.export_state())?;
        Ok(())
    }

    fn evaluate(&self, args: &ArgMatches) -> Result<(i32, bool)> {
        let path = args.get_one::<PathBuf>("report").context("report missing")?;
        let mode = submit_mode(args);
        let raw = read_report(path)?;
        let verdict = self
            .gate
            .submit(raw, mode)
            .with_context(|| format!("evaluating {}", path.display()))?;

        if args.get_flag("json") {
            print_json(&verdict.report())?;
        } else {
            print!("{}", verdict.render_text());
        }
        Ok((verdict.exit_code(), mode == SubmitMode::Record))
    }

    fn pipeline(&self, args: &ArgMatches) -> Result<(i32, bool)> {
        let paths: Vec<&PathBuf> = args
            .get_many::<PathBuf>("reports")
            .context("reports missing")?
            .collect();
        let mode = submit_mode(args);
        let texts = paths
            .iter()
            .map(|p| -> Result<(String, String)> { Ok((p.display().to_string(), read_text(p)?)) })
            .collect::<Result<Vec<(String, String)>>>()?;

        let outcome = self.gate.run_pipeline_json(
            texts.iter().map(|(label, text)| (label.as_str(), text.as_str())),
            mode,
        );
        // Stages that ran before a malformed one are already recorded
        if outcome.is_err() && mode == SubmitMode::Record {
            self.save()?;
        }
        let result = outcome.context("running pipeline")?;

        if args.get_flag("json") {
            let reports: Vec<_> = result.verdicts().iter().map(|v| v.report()).collect();
            print_json(&PipelineJson {
                pass: result.pass(),
                stages: reports,
                skipped: result.skipped(),
            })?;
        } else {
            for verdict in result.verdicts() {
                print!("{}", verdict.render_text());
            }
            for report in result.skipped() {
                println!("{report}: SKIPPED");
            }
        }
        Ok((result.exit_code(), mode == SubmitMode::Record))
    }

    fn quarantine(&self, args: &ArgMatches) -> Result<i32> {
        let test = args.get_one::<String>("test").context("test missing")?;
        let mut request = QuarantineRequest::new().test(test.as_str());
        if let Some(owner) = args.get_one::<String>("owner") {
            request = request.owner(owner.as_str());
        }
        if let Some(ticket) = args.get_one::<String>("ticket") {
            request = request.ticket(ticket.as_str());
        }
        if let Some(expires_at) = expiry(args, self.gate.tracker().now()) {
            request = request.expires_at(expires_at);
        }

        let quarantine = self.gate.quarantine(&request)?;
        println!(
            "quarantined {test} until {} (owner {}, ticket {})",
            quarantine.expires_at.to_rfc3339(),
            quarantine.owner,
            quarantine.ticket
        );
        Ok(EXIT_PASS)
    }

    fn release(&self, args: &ArgMatches) -> Result<i32> {
        let test = args.get_one::<String>("test").context("test missing")?;
        let released = self.gate.release(&test.as_str().into())?;
        println!("released {test} (ticket {})", released.ticket);
        Ok(EXIT_PASS)
    }

    fn sweep(&self, args: &ArgMatches) -> Result<i32> {
        let count = self.gate.sweep_expired();
        let events = self.sink.drain();
        if args.get_flag("json") {
            print_json(&events)?;
        } else {
            for event in &events {
                println!("{event}");
            }
            println!("{count} quarantine(s) expired");
        }
        Ok(EXIT_PASS)
    }

    fn status(&self, args: &ArgMatches) -> Result<i32> {
        let status = self.gate.status();
        if args.get_flag("json") {
            print_json(&status)?;
        } else {
            print!("{}", status.render_text());
        }
        Ok(EXIT_PASS)
    }

    /// Print escalations raised as a side effect of any command, returning
    /// how many there were
    fn report_escalations(&self) -> usize {
        let events = self.sink.drain();
        for event in &events {
            eprintln!("escalation: {event}");
        }
        events.len()
    }
}

#[derive(Serialize)]
struct PipelineJson<'a> {
    pass: bool,
    stages: Vec<qg_eval::VerdictReport>,
    skipped: &'a [String],
}

fn submit_mode(args: &ArgMatches) -> SubmitMode {
    if args.get_flag("dry-run") {
        SubmitMode::DryRun
    } else {
        SubmitMode::Record
    }
}

/// Expiry from `--expires` or `--days`
fn expiry(args: &ArgMatches, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(at) = args.get_one::<DateTime<Utc>>("expires") {
        return Some(*at);
    }
    args.get_one::<u32>("days")
        .map(|days| now + chrono::Duration::days(i64::from(*days)))
}

/// Read report text from a file, or stdin for `-`
fn read_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading report from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn read_report(path: &Path) -> Result<RawReport> {
    RawReport::from_json(&read_text(path)?)
        .with_context(|| format!("decoding report {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
