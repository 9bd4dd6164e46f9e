//! Blocking drivers for sampling sessions and single-shot fixes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use coordkit_traits::{LocationError, LocationFix, LocationProvider, PositionOptions};
use crossbeam_channel as xch;
use eyre::WrapErr;

use crate::error::{CoordError, Report, Result};
use crate::session::{Phase, SamplingSession, SessionOutcome};

/// Where `run_session` stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStop {
    Complete(SessionOutcome),
    /// Collection finished and the session waits in `Review`.
    Review,
}

/// What to do with a session sitting in `Review`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewPlan {
    /// Indices into the accepted samples as they were when review began.
    pub drop: Vec<usize>,
    pub extra_batches: usize,
}

fn terminal_result<P: LocationProvider>(session: &SamplingSession<P>) -> Result<SessionOutcome> {
    match session.outcome() {
        Some(Ok(outcome)) => Ok(outcome.clone()),
        Some(Err(e)) => Err(Report::new(e.clone())),
        None => Err(Report::new(CoordError::Cancelled)),
    }
}

/// Pump `session` until `stop(phase)` holds, a terminal phase is reached,
/// or `cancel` is raised. Waits at most `tick` between checks.
fn drive<P, F>(
    session: &mut SamplingSession<P>,
    cancel: &AtomicBool,
    tick: Duration,
    stop: F,
) -> Result<Phase>
where
    P: LocationProvider,
    F: Fn(Phase) -> bool,
{
    let tick = tick.max(Duration::from_millis(1));
    loop {
        if cancel.load(Ordering::Relaxed) {
            let _ = session.cancel();
            return Err(Report::new(CoordError::Cancelled));
        }
        let phase = session.pump();
        if phase.is_terminal() || stop(phase) {
            return Ok(phase);
        }
        let wait = session.until_next_deadline().map_or(tick, |d| d.min(tick));
        session.wait(wait);
    }
}

/// Run `session` until it completes, fails, is cancelled via `cancel`, or
/// reaches `Review`.
pub fn run_session<P: LocationProvider>(
    session: &mut SamplingSession<P>,
    cancel: &AtomicBool,
    tick: Duration,
) -> Result<SessionStop> {
    let phase = drive(session, cancel, tick, |p| p == Phase::Review)?;
    if phase == Phase::Review {
        return Ok(SessionStop::Review);
    }
    terminal_result(session).map(SessionStop::Complete)
}

/// Apply `plan` to a session in `Review` and confirm it.
pub fn finish_review<P: LocationProvider>(
    session: &mut SamplingSession<P>,
    plan: &ReviewPlan,
    cancel: &AtomicBool,
    tick: Duration,
) -> Result<SessionOutcome> {
    let mut drop = plan.drop.clone();
    drop.sort_unstable_by(|a, b| b.cmp(a));
    drop.dedup();
    for index in drop {
        session
            .remove_sample(index)
            .map_err(Report::new)
            .wrap_err_with(|| format!("drop sample {index}"))?;
    }

    for batch in 0..plan.extra_batches {
        session
            .extend_by_batch()
            .map_err(Report::new)
            .wrap_err_with(|| format!("start extension batch {}", batch + 1))?;
        let phase = drive(session, cancel, tick, |p| p == Phase::Review)?;
        if phase.is_terminal() {
            return terminal_result(session);
        }
    }

    session.confirm().map_err(Report::new)?;
    terminal_result(session)
}

/// Request one fix and block until it arrives or `options.timeout` elapses.
pub fn current_position<P: LocationProvider + ?Sized>(
    provider: &mut P,
    options: PositionOptions,
) -> Result<LocationFix> {
    let (tx, rx) = xch::bounded(1);
    provider.get_current_position(
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
        options,
    );
    let result = rx.recv_timeout(options.timeout).unwrap_or_else(|_| {
        Err(LocationError::timeout(
            "Timed out waiting for a position fix",
        ))
    });
    result
        .map_err(|e| Report::new(CoordError::Provider(e)))
        .wrap_err("single-shot position request")
}
