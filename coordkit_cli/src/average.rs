//! `average`: run a sampling session to completion and store the result.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use coordkit_config::MAX_PHASE_MS;
use coordkit_core::error::Report;
use coordkit_core::runner::{ReviewPlan, SessionStop, finish_review, run_session};
use coordkit_core::util::duration_ms;
use coordkit_core::{
    CoordError, DEFAULT_CRS_CODE, Phase, Progress, RecordStore, SamplingSession, SessionConfig,
    SessionObserver,
};
use coordkit_traits::{Clock, LocationFix, MonotonicClock};
use serde_json::json;

use crate::app::App;
use crate::ops::{emit, record_json, render_record};

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
pub struct AverageArgs {
    pub warmup_ms: Option<u64>,
    pub collection_ms: Option<u64>,
    pub fixture: Option<PathBuf>,
    pub extra_batches: usize,
    pub drop: Vec<usize>,
    pub name: Option<String>,
}

/// Writes progress to stderr; stdout is reserved for the final record.
struct ProgressPrinter {
    json: bool,
}

impl SessionObserver for ProgressPrinter {
    fn on_progress(&mut self, p: &Progress) {
        if self.json {
            let v = json!({
                "event": "progress",
                "phase": p.phase,
                "elapsed_ms": duration_ms(p.elapsed),
                "warmup_remaining_ms": p.warmup_remaining.map(duration_ms),
                "collecting_elapsed_ms": p.collecting_elapsed.map(duration_ms),
                "collecting_total_ms": p.collecting_total.map(duration_ms),
                "samples_accepted": p.samples_accepted,
                "samples_discarded": p.samples_discarded,
                "latest_accuracy": p.latest_accuracy,
                "current_average": p.current_average,
                "target_samples": p.target_samples,
            });
            eprintln!("{v}");
            return;
        }
        let line = match p.phase {
            Phase::Warmup => format!(
                "warming up: {:.1} s left",
                p.warmup_remaining.unwrap_or_default().as_secs_f64()
            ),
            Phase::Collecting => format!(
                "collecting: {:.1}/{:.1} s, {} accepted, {} discarded{}",
                p.collecting_elapsed.unwrap_or_default().as_secs_f64(),
                p.collecting_total.unwrap_or_default().as_secs_f64(),
                p.samples_accepted,
                p.samples_discarded,
                p.latest_accuracy
                    .map(|a| format!(", last ±{a:.1} m"))
                    .unwrap_or_default()
            ),
            phase => format!(
                "{phase}: {}/{} samples, {} discarded",
                p.samples_accepted,
                p.target_samples.unwrap_or(p.samples_accepted),
                p.samples_discarded
            ),
        };
        eprintln!("{line}");
    }

    fn on_sample_accepted(&mut self, fix: &LocationFix) {
        tracing::debug!(accuracy_m = fix.accuracy, "sample accepted");
    }
}

fn override_ms(flag: &str, value: Option<u64>, fallback: u64) -> eyre::Result<u64> {
    match value {
        Some(ms) if ms > MAX_PHASE_MS => Err(Report::new(CoordError::InvalidArgument(format!(
            "{flag} must be <= {MAX_PHASE_MS}"
        )))),
        Some(ms) => Ok(ms),
        None => Ok(fallback),
    }
}

pub fn run(app: &App, args: &AverageArgs, cancel: &AtomicBool) -> eyre::Result<()> {
    let mut sampling = app.cfg.sampling.clone();
    sampling.warmup_ms = override_ms("--warmup-ms", args.warmup_ms, sampling.warmup_ms)?;
    sampling.collection_ms =
        override_ms("--collection-ms", args.collection_ms, sampling.collection_ms)?;

    let mut config = SessionConfig::from(&sampling);
    config.review = args.extra_batches > 0 || !args.drop.is_empty();

    let provider = app.provider(args.fixture.as_deref())?;
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let mut session = SamplingSession::start(
        provider,
        clock,
        config,
        Box::new(ProgressPrinter { json: app.json }),
    )?;

    let outcome = match run_session(&mut session, cancel, TICK)? {
        SessionStop::Complete(outcome) => outcome,
        SessionStop::Review => {
            let plan = ReviewPlan {
                drop: args.drop.clone(),
                extra_batches: args.extra_batches,
            };
            finish_review(&mut session, &plan, cancel, TICK)?
        }
    };
    drop(session);

    let mut store = RecordStore::new();
    let record = store.add_from_estimate(DEFAULT_CRS_CODE, &outcome, args.name.as_deref())?;

    let mut value = record_json(app, &record);
    value["samples_used"] = json!(outcome.samples_used);
    value["samples_discarded"] = json!(outcome.samples_discarded);
    value["duration_ms"] = json!(duration_ms(outcome.duration));
    emit(app, &value, || render_record(app, &record));
    Ok(())
}
