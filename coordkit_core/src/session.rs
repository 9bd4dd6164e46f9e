//! Sampling session state machine.
//!
//! A session watches a `LocationProvider`, ignores fixes during warm-up,
//! admits fixes whose accuracy is within the threshold during collection,
//! and produces an inverse-squared-accuracy weighted estimate.
//!
//! ```text
//! Warmup -> Collecting -> Complete
//!                     \-> Review <-> Extending
//!                              \-> Complete
//! any non-terminal -> Failed | Cancelled
//! ```
//!
//! Everything is driven through [`SamplingSession::dispatch`]. Provider
//! callbacks only push into an internal channel; [`SamplingSession::pump`]
//! drains it, so a session is mutated from exactly one place. Time comes
//! from the injected `Clock`, so tests can step it manually.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use coordkit_traits::{
    Clock, LocationError, LocationFix, LocationProvider, PositionOptions, ProviderEvent, WatchId,
};
use crossbeam_channel as xch;
use serde::Serialize;

use crate::error::CoordError;
use crate::estimator::{WeightedPosition, admits, compute_weighted_average};
use crate::timer::Timer;
use crate::util::duration_ms;

/// Tunables for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub warmup: Duration,
    pub collection: Duration,
    pub max_accuracy_m: f64,
    pub progress_interval: Duration,
    /// Captures per extension batch.
    pub batch_size: usize,
    /// Delay between serial captures in an extension batch.
    pub capture_interval: Duration,
    pub capture_timeout: Duration,
    pub watch_timeout: Duration,
    /// Stop in `Review` at the collection deadline instead of finishing.
    pub review: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_millis(30_000),
            collection: Duration::from_millis(60_000),
            max_accuracy_m: 10.0,
            progress_interval: Duration::from_millis(500),
            batch_size: 10,
            capture_interval: Duration::from_millis(5_000),
            capture_timeout: Duration::from_millis(10_000),
            watch_timeout: Duration::from_millis(15_000),
            review: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.collection.is_zero() {
            return Err(CoordError::InvalidArgument(
                "collection duration must be > 0".into(),
            ));
        }
        if !(self.max_accuracy_m.is_finite() && self.max_accuracy_m > 0.0) {
            return Err(CoordError::InvalidArgument(
                "max accuracy must be a finite value > 0".into(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(CoordError::InvalidArgument(
                "progress interval must be > 0".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(CoordError::InvalidArgument("batch size must be >= 1".into()));
        }
        if self.capture_timeout.is_zero() {
            return Err(CoordError::InvalidArgument(
                "capture timeout must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Warmup,
    Collecting,
    /// Collection finished; waiting for confirm, extend or sample removal.
    Review,
    /// Running an extension batch of serial captures.
    Extending,
    Complete,
    Failed,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Collecting => "collecting",
            Self::Review => "review",
            Self::Extending => "extending",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot handed to `on_progress`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub phase: Phase,
    pub elapsed: Duration,
    pub warmup_remaining: Option<Duration>,
    pub collecting_elapsed: Option<Duration>,
    pub collecting_total: Option<Duration>,
    pub samples_accepted: usize,
    pub samples_discarded: usize,
    pub latest_accuracy: Option<f64>,
    pub current_average: Option<WeightedPosition>,
    /// Effective target count; only set once collection has finished.
    pub target_samples: Option<usize>,
}

/// Successful session result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub latitude: f64,
    pub longitude: f64,
    pub samples_used: usize,
    pub samples_discarded: usize,
    /// Collection duration plus any time spent in extension batches.
    pub duration: Duration,
}

/// Session callbacks. All default to no-ops.
///
/// Once `on_success` or `on_error` fires nothing else is called. A
/// cancelled session calls nothing at all.
pub trait SessionObserver {
    fn on_progress(&mut self, _progress: &Progress) {}
    fn on_sample_accepted(&mut self, _fix: &LocationFix) {}
    fn on_success(&mut self, _outcome: &SessionOutcome) {}
    fn on_error(&mut self, _error: &CoordError) {}
}

impl SessionObserver for () {}

impl<O: SessionObserver + ?Sized> SessionObserver for Box<O> {
    fn on_progress(&mut self, progress: &Progress) {
        (**self).on_progress(progress);
    }
    fn on_sample_accepted(&mut self, fix: &LocationFix) {
        (**self).on_sample_accepted(fix);
    }
    fn on_success(&mut self, outcome: &SessionOutcome) {
        (**self).on_success(outcome);
    }
    fn on_error(&mut self, error: &CoordError) {
        (**self).on_error(error);
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Re-evaluate timers against the clock.
    Tick,
    /// Raw fix from the watch subscription.
    Fix(LocationFix),
    /// Error from the watch subscription.
    ProviderFailed(LocationError),
    /// Result of the pending extension capture.
    Capture(Result<LocationFix, LocationError>),
    Extend,
    RemoveSample(usize),
    Confirm,
    Cancel,
}

enum Inbound {
    /// Stamped with the session clock when the provider delivered it.
    Watch(ProviderEvent, Instant),
    Capture { seq: u64, result: Result<LocationFix, LocationError> },
}

#[derive(Debug)]
struct Extension {
    remaining: usize,
    started: Instant,
    pending: Option<u64>,
    timeout: Option<Timer>,
    next_capture: Option<Timer>,
}

pub struct SamplingSession<P: LocationProvider> {
    provider: P,
    clock: Arc<dyn Clock + Send + Sync>,
    observer: Box<dyn SessionObserver>,
    config: SessionConfig,
    phase: Phase,
    started: Instant,
    warmup_timer: Timer,
    collection_timer: Timer,
    progress_timer: Timer,
    watch: Option<WatchId>,
    accepted: Vec<LocationFix>,
    discarded: usize,
    average: Option<WeightedPosition>,
    latest_accuracy: Option<f64>,
    target: Option<usize>,
    extension: Option<Extension>,
    extension_time: Duration,
    capture_seq: u64,
    tx: xch::Sender<Inbound>,
    rx: xch::Receiver<Inbound>,
    outcome: Option<Result<SessionOutcome, CoordError>>,
}

impl<P: LocationProvider> SamplingSession<P> {
    /// Subscribe to `provider` and start the warm-up clock.
    ///
    /// Only an invalid `config` is reported synchronously. A provider that
    /// refuses the subscription fails the session through `on_error`.
    pub fn start(
        provider: P,
        clock: Arc<dyn Clock + Send + Sync>,
        config: SessionConfig,
        observer: Box<dyn SessionObserver>,
    ) -> Result<Self, CoordError> {
        config.validate()?;
        let (tx, rx) = xch::unbounded();
        let started = clock.now();
        let warmup_deadline = started + config.warmup;
        let mut session = Self {
            provider,
            warmup_timer: Timer::at(warmup_deadline),
            collection_timer: Timer::at(warmup_deadline + config.collection),
            progress_timer: Timer::after(started, config.progress_interval),
            clock,
            observer,
            phase: Phase::Warmup,
            started,
            watch: None,
            accepted: Vec::new(),
            discarded: 0,
            average: None,
            latest_accuracy: None,
            target: None,
            extension: None,
            extension_time: Duration::ZERO,
            capture_seq: 0,
            tx,
            rx,
            outcome: None,
            config,
        };

        tracing::info!(
            warmup_ms = duration_ms(session.config.warmup),
            collection_ms = duration_ms(session.config.collection),
            max_accuracy_m = session.config.max_accuracy_m,
            "sampling session started"
        );

        let sink = session.tx.clone();
        let stamp = Arc::clone(&session.clock);
        let options = PositionOptions {
            high_accuracy: true,
            timeout: session.config.watch_timeout,
            max_cache_age: Duration::ZERO,
        };
        match session.provider.watch_position(
            Box::new(move |ev| {
                // Receiver gone means the session is finished with us.
                let _ = sink.send(Inbound::Watch(ev, stamp.now()));
            }),
            options,
        ) {
            Ok(id) => session.watch = Some(id),
            Err(e) => {
                session.fail(CoordError::Provider(e));
                return Ok(session);
            }
        }

        session.advance_timers();
        if !session.phase.is_terminal() {
            session.emit_progress();
        }
        Ok(session)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn accepted(&self) -> &[LocationFix] {
        &self.accepted
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn average(&self) -> Option<WeightedPosition> {
        self.average
    }

    pub fn target_samples(&self) -> Option<usize> {
        self.target
    }

    pub fn watch_active(&self) -> bool {
        self.watch.is_some()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Terminal result, once there is one. `None` while running or cancelled.
    pub fn outcome(&self) -> Option<&Result<SessionOutcome, CoordError>> {
        self.outcome.as_ref()
    }

    pub fn progress(&self) -> Progress {
        let now = self.clock.now();
        let warmup_deadline = self.started + self.config.warmup;
        let (warmup_remaining, collecting_elapsed, collecting_total) = match self.phase {
            Phase::Warmup => (
                Some(warmup_deadline.saturating_duration_since(now)),
                None,
                None,
            ),
            Phase::Collecting => (
                None,
                Some(
                    now.saturating_duration_since(warmup_deadline)
                        .min(self.config.collection),
                ),
                Some(self.config.collection),
            ),
            _ => (
                None,
                Some(self.config.collection),
                Some(self.config.collection),
            ),
        };
        Progress {
            phase: self.phase,
            elapsed: now.saturating_duration_since(self.started),
            warmup_remaining,
            collecting_elapsed,
            collecting_total,
            samples_accepted: self.accepted.len(),
            samples_discarded: self.discarded,
            latest_accuracy: self.latest_accuracy,
            current_average: self.average,
            target_samples: self.target,
        }
    }

    /// Earliest armed deadline, for callers that block between events.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut timers = vec![
            &self.warmup_timer,
            &self.collection_timer,
            &self.progress_timer,
        ];
        if let Some(ext) = &self.extension {
            timers.extend(ext.timeout.iter());
            timers.extend(ext.next_capture.iter());
        }
        timers
            .into_iter()
            .filter(|t| t.is_armed())
            .map(Timer::deadline)
            .min()
    }

    pub fn until_next_deadline(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.next_deadline()
            .map(|d| d.saturating_duration_since(now))
    }

    /// Drain provider callbacks, then re-check timers. Never blocks.
    pub fn pump(&mut self) -> Phase {
        while let Ok(msg) = self.rx.try_recv() {
            self.route(msg);
        }
        let _ = self.dispatch(SessionEvent::Tick);
        self.phase
    }

    /// Wait up to `timeout` for one provider callback, then pump.
    pub fn wait(&mut self, timeout: Duration) -> Phase {
        if let Ok(msg) = self.rx.recv_timeout(timeout) {
            self.route(msg);
        }
        self.pump()
    }

    fn route(&mut self, msg: Inbound) {
        let event = match msg {
            Inbound::Watch(ProviderEvent::Fix(fix), at) => {
                self.handle_fix(fix, at);
                return;
            }
            Inbound::Watch(ProviderEvent::Error(e), _) => SessionEvent::ProviderFailed(e),
            Inbound::Capture { seq, result } => {
                let current = self.extension.as_ref().and_then(|x| x.pending);
                if current != Some(seq) {
                    tracing::debug!(seq, "dropping stale capture result");
                    return;
                }
                SessionEvent::Capture(result)
            }
        };
        let _ = self.dispatch(event);
    }

    pub fn cancel(&mut self) -> Result<(), CoordError> {
        self.dispatch(SessionEvent::Cancel)
    }

    pub fn extend_by_batch(&mut self) -> Result<(), CoordError> {
        self.dispatch(SessionEvent::Extend)
    }

    pub fn remove_sample(&mut self, index: usize) -> Result<(), CoordError> {
        self.dispatch(SessionEvent::RemoveSample(index))
    }

    pub fn confirm(&mut self) -> Result<(), CoordError> {
        self.dispatch(SessionEvent::Confirm)
    }

    /// Single entry point for every state change.
    ///
    /// Returns `Err` only for commands that are invalid in the current
    /// phase or carry a bad argument. Session failures go to `on_error`.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<(), CoordError> {
        if let SessionEvent::Cancel = event {
            self.handle_cancel();
            return Ok(());
        }

        self.advance_timers();

        match event {
            SessionEvent::Tick | SessionEvent::Cancel => Ok(()),
            SessionEvent::Fix(fix) => {
                let now = self.clock.now();
                self.handle_fix(fix, now);
                Ok(())
            }
            SessionEvent::ProviderFailed(e) => {
                if matches!(
                    self.phase,
                    Phase::Warmup | Phase::Collecting | Phase::Extending
                ) {
                    tracing::warn!(code = e.code.name(), error = %e, "location provider failed");
                    self.fail(CoordError::Provider(e));
                }
                Ok(())
            }
            SessionEvent::Capture(result) => self.handle_capture(result),
            SessionEvent::Extend => self.handle_extend(),
            SessionEvent::RemoveSample(i) => self.handle_remove(i),
            SessionEvent::Confirm => self.handle_confirm(),
        }
    }

    fn advance_timers(&mut self) {
        let now = self.clock.now();

        self.advance_warmup(now);

        if self.phase == Phase::Collecting && self.collection_timer.poll(now) {
            self.finish_collection();
            return;
        }

        if matches!(self.phase, Phase::Warmup | Phase::Collecting) && self.progress_timer.poll(now)
        {
            self.emit_progress();
            self.progress_timer = Timer::after(now, self.config.progress_interval);
        }

        if self.phase == Phase::Extending {
            let timed_out = self
                .extension
                .as_mut()
                .and_then(|x| x.timeout.as_mut())
                .is_some_and(|t| t.poll(now));
            if timed_out {
                self.fail(CoordError::Provider(LocationError::timeout(
                    "Timed out waiting for a position fix",
                )));
                return;
            }
            let due = self
                .extension
                .as_mut()
                .and_then(|x| x.next_capture.as_mut())
                .is_some_and(|t| t.poll(now));
            if due {
                self.request_capture();
            }
        }
    }

    fn advance_warmup(&mut self, now: Instant) {
        if self.phase == Phase::Warmup && self.warmup_timer.poll(now) {
            self.phase = Phase::Collecting;
            tracing::info!(phase = %self.phase, "warm-up finished");
            self.emit_progress();
        }
    }

    /// Classify a watch fix by `at`, the time the provider delivered it,
    /// not the time it was drained.
    fn handle_fix(&mut self, fix: LocationFix, at: Instant) {
        if !matches!(self.phase, Phase::Warmup | Phase::Collecting) {
            return;
        }
        if at < self.warmup_timer.deadline() {
            tracing::trace!(accuracy_m = fix.accuracy, "fix ignored during warm-up");
            return;
        }
        if at >= self.collection_timer.deadline() {
            tracing::debug!(accuracy_m = fix.accuracy, "fix after collection window dropped");
            return;
        }
        self.advance_warmup(self.clock.now());
        if self.phase == Phase::Collecting {
            self.classify(fix);
            self.emit_progress();
        }
    }

    /// Admission filter shared by the watch and extension captures.
    /// Returns whether the fix was accepted.
    fn classify(&mut self, fix: LocationFix) -> bool {
        self.latest_accuracy = Some(fix.accuracy);
        if admits(fix.accuracy, self.config.max_accuracy_m) {
            self.accepted.push(fix);
            self.average = compute_weighted_average(&self.accepted);
            tracing::debug!(
                accuracy_m = fix.accuracy,
                accepted = self.accepted.len(),
                "fix accepted"
            );
            self.observer.on_sample_accepted(&fix);
            true
        } else {
            self.discarded += 1;
            tracing::debug!(
                accuracy_m = fix.accuracy,
                discarded = self.discarded,
                "fix discarded"
            );
            false
        }
    }

    fn finish_collection(&mut self) {
        self.clear_watch();
        self.progress_timer.cancel();
        tracing::info!(
            accepted = self.accepted.len(),
            discarded = self.discarded,
            "collection finished"
        );
        if self.accepted.is_empty() {
            let msg = format!(
                "No valid samples (accuracy ≤ {} m required)",
                self.config.max_accuracy_m
            );
            self.fail(CoordError::PositionUnavailable(msg));
            return;
        }
        if self.config.review {
            self.phase = Phase::Review;
            self.target = Some(self.accepted.len());
            self.emit_progress();
        } else {
            self.succeed();
        }
    }

    fn handle_extend(&mut self) -> Result<(), CoordError> {
        if self.phase != Phase::Review {
            return Err(CoordError::InvalidState(format!(
                "cannot extend a session in phase {}",
                self.phase
            )));
        }
        let batch = self.config.batch_size;
        self.target = Some(self.target.unwrap_or(self.accepted.len()) + batch);
        self.phase = Phase::Extending;
        self.extension = Some(Extension {
            remaining: batch,
            started: self.clock.now(),
            pending: None,
            timeout: None,
            next_capture: None,
        });
        tracing::info!(batch, target = ?self.target, "extension batch started");
        self.emit_progress();
        self.request_capture();
        Ok(())
    }

    fn request_capture(&mut self) {
        self.capture_seq += 1;
        let seq = self.capture_seq;
        let now = self.clock.now();
        if let Some(ext) = self.extension.as_mut() {
            ext.pending = Some(seq);
            ext.next_capture = None;
            ext.timeout = Some(Timer::after(now, self.config.capture_timeout));
        }
        let sink = self.tx.clone();
        let options = PositionOptions {
            high_accuracy: true,
            timeout: self.config.capture_timeout,
            max_cache_age: Duration::ZERO,
        };
        tracing::debug!(seq, "requesting extension capture");
        self.provider.get_current_position(
            Box::new(move |result| {
                let _ = sink.send(Inbound::Capture { seq, result });
            }),
            options,
        );
    }

    fn handle_capture(&mut self, result: Result<LocationFix, LocationError>) -> Result<(), CoordError> {
        let pending = self.extension.as_ref().and_then(|x| x.pending);
        if self.phase != Phase::Extending || pending.is_none() {
            return Err(CoordError::InvalidState(
                "no capture is pending".into(),
            ));
        }
        let fix = match result {
            Ok(fix) => fix,
            Err(e) => {
                tracing::warn!(code = e.code.name(), error = %e, "extension capture failed");
                self.fail(CoordError::Provider(e));
                return Ok(());
            }
        };

        let now = self.clock.now();
        if let Some(ext) = self.extension.as_mut() {
            ext.pending = None;
            if let Some(t) = ext.timeout.as_mut() {
                t.cancel();
            }
            ext.remaining = ext.remaining.saturating_sub(1);
        }
        if !self.classify(fix) {
            self.target = self.target.map(|t| t.saturating_sub(1));
        }

        let remaining = self.extension.as_ref().map_or(0, |x| x.remaining);
        if remaining == 0 {
            if let Some(ext) = self.extension.take() {
                self.extension_time += now.saturating_duration_since(ext.started);
            }
            self.phase = Phase::Review;
            tracing::info!(
                accepted = self.accepted.len(),
                discarded = self.discarded,
                "extension batch finished"
            );
        } else if let Some(ext) = self.extension.as_mut() {
            ext.next_capture = Some(Timer::after(now, self.config.capture_interval));
        }
        self.emit_progress();
        Ok(())
    }

    fn handle_remove(&mut self, index: usize) -> Result<(), CoordError> {
        if !matches!(self.phase, Phase::Collecting | Phase::Review) {
            return Err(CoordError::InvalidState(format!(
                "cannot remove samples in phase {}",
                self.phase
            )));
        }
        if index >= self.accepted.len() {
            return Err(CoordError::InvalidArgument(format!(
                "sample index {index} out of range (have {})",
                self.accepted.len()
            )));
        }
        let removed = self.accepted.remove(index);
        self.average = compute_weighted_average(&self.accepted);
        if self.phase == Phase::Review {
            self.target = self.target.map(|t| t.saturating_sub(1));
        }
        tracing::debug!(index, accuracy_m = removed.accuracy, "sample removed");
        self.emit_progress();
        Ok(())
    }

    fn handle_confirm(&mut self) -> Result<(), CoordError> {
        if self.phase != Phase::Review {
            return Err(CoordError::InvalidState(format!(
                "cannot confirm a session in phase {}",
                self.phase
            )));
        }
        if self.accepted.is_empty() {
            let msg = "all samples were removed".to_string();
            self.fail(CoordError::PositionUnavailable(msg));
        } else {
            self.succeed();
        }
        Ok(())
    }

    fn handle_cancel(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.teardown();
        self.accepted.clear();
        self.average = None;
        self.phase = Phase::Cancelled;
        tracing::info!("sampling session cancelled");
    }

    fn succeed(&mut self) {
        let Some(avg) = self.average else {
            self.fail(CoordError::PositionUnavailable(
                "no weighted average available".into(),
            ));
            return;
        };
        self.teardown();
        let outcome = SessionOutcome {
            latitude: avg.latitude,
            longitude: avg.longitude,
            samples_used: self.accepted.len(),
            samples_discarded: self.discarded,
            duration: self.config.collection + self.extension_time,
        };
        self.phase = Phase::Complete;
        tracing::info!(
            latitude = outcome.latitude,
            longitude = outcome.longitude,
            samples_used = outcome.samples_used,
            samples_discarded = outcome.samples_discarded,
            "sampling session complete"
        );
        self.observer.on_success(&outcome);
        self.outcome = Some(Ok(outcome));
    }

    fn fail(&mut self, err: CoordError) {
        self.teardown();
        self.phase = Phase::Failed;
        tracing::warn!(error = %err, "sampling session failed");
        self.observer.on_error(&err);
        self.outcome = Some(Err(err));
    }

    fn teardown(&mut self) {
        self.clear_watch();
        self.warmup_timer.cancel();
        self.collection_timer.cancel();
        self.progress_timer.cancel();
        if let Some(mut ext) = self.extension.take() {
            if let Some(t) = ext.timeout.as_mut() {
                t.cancel();
            }
            if let Some(t) = ext.next_capture.as_mut() {
                t.cancel();
            }
        }
    }

    fn clear_watch(&mut self) {
        if let Some(id) = self.watch.take() {
            self.provider.clear_watch(id);
            tracing::trace!(watch = id.0, "watch cleared");
        }
    }

    fn emit_progress(&mut self) {
        let p = self.progress();
        self.observer.on_progress(&p);
    }
}

impl<P: LocationProvider> Drop for SamplingSession<P> {
    fn drop(&mut self) {
        self.clear_watch();
    }
}
