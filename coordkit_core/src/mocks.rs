//! Test doubles for driving sessions deterministically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use coordkit_traits::{
    LocationError, LocationFix, LocationProvider, PositionCallback, PositionOptions,
    ProviderEvent, WatchCallback, WatchId,
};

use crate::error::CoordError;
use crate::session::{Progress, SessionObserver, SessionOutcome};

#[derive(Default)]
struct Script {
    watch: Option<(WatchId, WatchCallback)>,
    next_id: u64,
    watch_requests: usize,
    refuse_watch: Option<LocationError>,
    captures: VecDeque<PositionCallback>,
    capture_requests: usize,
    last_options: Option<PositionOptions>,
}

fn lock(s: &Mutex<Script>) -> MutexGuard<'_, Script> {
    s.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Provider that does nothing on its own. A [`ScriptHandle`] pushes fixes
/// and errors into the active watch and answers single-shot requests.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

/// Test-side handle to a [`ScriptedProvider`].
#[derive(Clone)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new() -> (Self, ScriptHandle) {
        let p = Self::default();
        let h = ScriptHandle {
            script: p.script.clone(),
        };
        (p, h)
    }
}

impl LocationProvider for ScriptedProvider {
    fn watch_position(
        &mut self,
        on_event: WatchCallback,
        options: PositionOptions,
    ) -> Result<WatchId, LocationError> {
        let mut s = lock(&self.script);
        s.watch_requests += 1;
        s.last_options = Some(options);
        if let Some(e) = s.refuse_watch.take() {
            return Err(e);
        }
        s.next_id += 1;
        let id = WatchId(s.next_id);
        s.watch = Some((id, on_event));
        Ok(id)
    }

    fn clear_watch(&mut self, id: WatchId) {
        let mut s = lock(&self.script);
        if s.watch.as_ref().is_some_and(|(w, _)| *w == id) {
            s.watch = None;
        }
    }

    fn get_current_position(&mut self, on_result: PositionCallback, options: PositionOptions) {
        let mut s = lock(&self.script);
        s.capture_requests += 1;
        s.last_options = Some(options);
        s.captures.push_back(on_result);
    }
}

impl ScriptHandle {
    /// Deliver a fix to the active watch. Returns false if none is active.
    pub fn emit_fix(&self, fix: LocationFix) -> bool {
        self.emit(ProviderEvent::Fix(fix))
    }

    pub fn emit_error(&self, error: LocationError) -> bool {
        self.emit(ProviderEvent::Error(error))
    }

    fn emit(&self, ev: ProviderEvent) -> bool {
        let mut s = lock(&self.script);
        match s.watch.as_mut() {
            Some((_, cb)) => {
                cb(ev);
                true
            }
            None => false,
        }
    }

    /// Number of live watch subscriptions (0 or 1).
    pub fn active_watches(&self) -> usize {
        usize::from(lock(&self.script).watch.is_some())
    }

    pub fn watch_requests(&self) -> usize {
        lock(&self.script).watch_requests
    }

    /// Make the next `watch_position` call fail with `error`.
    pub fn refuse_next_watch(&self, error: LocationError) {
        lock(&self.script).refuse_watch = Some(error);
    }

    pub fn pending_captures(&self) -> usize {
        lock(&self.script).captures.len()
    }

    pub fn capture_requests(&self) -> usize {
        lock(&self.script).capture_requests
    }

    pub fn last_options(&self) -> Option<PositionOptions> {
        lock(&self.script).last_options
    }

    /// Answer the oldest pending single-shot request.
    pub fn answer_capture(&self, result: Result<LocationFix, LocationError>) -> bool {
        let cb = lock(&self.script).captures.pop_front();
        match cb {
            Some(cb) => {
                cb(result);
                true
            }
            None => false,
        }
    }
}

/// One observer callback, as recorded by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    Progress(Progress),
    Accepted(LocationFix),
    Success(SessionOutcome),
    Error(CoordError),
}

/// Observer that records every callback. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<Vec<Callback>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callbacks(&self) -> Vec<Callback> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn progress(&self) -> Vec<Progress> {
        self.callbacks()
            .into_iter()
            .filter_map(|c| match c {
                Callback::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn push(&self, c: Callback) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(c);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_progress(&mut self, progress: &Progress) {
        self.push(Callback::Progress(progress.clone()));
    }
    fn on_sample_accepted(&mut self, fix: &LocationFix) {
        self.push(Callback::Accepted(*fix));
    }
    fn on_success(&mut self, outcome: &SessionOutcome) {
        self.push(Callback::Success(outcome.clone()));
    }
    fn on_error(&mut self, error: &CoordError) {
        self.push(Callback::Error(error.clone()));
    }
}
