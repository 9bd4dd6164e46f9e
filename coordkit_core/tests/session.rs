//! Deterministic session tests: manual clock, scripted provider.

use std::sync::Arc;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use coordkit_core::mocks::{Callback, RecordingObserver, ScriptHandle, ScriptedProvider};
use coordkit_core::{CoordError, Phase, SamplingSession, SessionConfig, SessionEvent};
use coordkit_traits::{LocationError, LocationErrorCode, LocationFix, ManualClock};

struct Rig {
    session: SamplingSession<ScriptedProvider>,
    gps: ScriptHandle,
    clock: ManualClock,
    seen: RecordingObserver,
}

fn rig(config: SessionConfig) -> Rig {
    let clock = ManualClock::new();
    let (provider, gps) = ScriptedProvider::new();
    let seen = RecordingObserver::new();
    let session =
        SamplingSession::start(provider, Arc::new(clock.clone()), config, Box::new(seen.clone()))
            .unwrap();
    Rig {
        session,
        gps,
        clock,
        seen,
    }
}

fn fix(lat: f64, lon: f64, acc: f64) -> LocationFix {
    LocationFix::new(lat, lon, acc)
}

impl Rig {
    fn feed(&mut self, f: LocationFix) {
        assert!(self.gps.emit_fix(f), "no active watch");
        self.session.pump();
    }

    fn advance_ms(&mut self, ms: u64) -> Phase {
        self.clock.advance_ms(ms);
        self.session.pump()
    }

    fn last(&self) -> Option<Callback> {
        self.seen.callbacks().last().cloned()
    }
}

fn review_config() -> SessionConfig {
    SessionConfig {
        review: true,
        batch_size: 3,
        ..SessionConfig::default()
    }
}

#[test]
fn starts_in_warmup_with_one_watch() {
    let r = rig(SessionConfig::default());
    assert_eq!(r.session.phase(), Phase::Warmup);
    assert_eq!(r.gps.active_watches(), 1);
    let opts = r.gps.last_options().unwrap();
    assert!(opts.high_accuracy);
    assert_eq!(opts.timeout, Duration::from_millis(15_000));
    assert_eq!(opts.max_cache_age, Duration::ZERO);
    let first = r.seen.progress();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].warmup_remaining, Some(Duration::from_secs(30)));
}

#[test]
fn warmup_fixes_are_ignored_entirely() {
    let mut r = rig(SessionConfig::default());
    for i in 0..10 {
        r.clock.advance_ms(1_000);
        r.feed(fix(1.0 + f64::from(i), 2.0, if i % 2 == 0 { 3.0 } else { 30.0 }));
    }
    assert_eq!(r.session.accepted().len(), 0);
    assert_eq!(r.session.discarded(), 0);

    // nothing arrives during collection
    assert_eq!(r.advance_ms(80_000), Phase::Failed);
    assert_eq!(r.session.discarded(), 0);
    match r.last() {
        Some(Callback::Error(CoordError::PositionUnavailable(msg))) => {
            assert!(msg.contains("No valid samples"));
        }
        other => panic!("expected PositionUnavailable, got {other:?}"),
    }
    assert!(
        !r.seen
            .callbacks()
            .iter()
            .any(|c| matches!(c, Callback::Success(_)))
    );
}

#[test]
fn inaccurate_fixes_are_discarded_without_moving_average() {
    let mut r = rig(SessionConfig::default());
    assert_eq!(r.advance_ms(30_000), Phase::Collecting);

    r.feed(fix(-30.0, 135.0, 5.0));
    let avg = r.session.average().unwrap();

    r.feed(fix(10.0, 10.0, 15.0));
    r.feed(fix(10.0, 10.0, 10.5));
    r.feed(fix(10.0, 10.0, f64::NAN));
    assert_eq!(r.session.discarded(), 3);
    assert_eq!(r.session.accepted().len(), 1);
    assert_eq!(r.session.average(), Some(avg));

    let p = r.seen.progress().last().cloned().unwrap();
    assert_eq!(p.phase, Phase::Collecting);
    assert_eq!(p.samples_discarded, 3);
    assert!(p.latest_accuracy.unwrap().is_nan());
}

#[test]
fn threshold_is_inclusive() {
    let mut r = rig(SessionConfig::default());
    r.advance_ms(30_000);
    r.feed(fix(1.0, 1.0, 10.0));
    assert_eq!(r.session.accepted().len(), 1);
    let accepted: Vec<_> = r
        .seen
        .callbacks()
        .into_iter()
        .filter(|c| matches!(c, Callback::Accepted(_)))
        .collect();
    assert_eq!(accepted, vec![Callback::Accepted(fix(1.0, 1.0, 10.0))]);
}

#[test]
fn completes_with_weighted_average() {
    let mut r = rig(SessionConfig::default());
    r.advance_ms(30_000);
    r.feed(fix(0.0, 0.0, 2.0));
    r.advance_ms(10_000);
    r.feed(fix(10.0, 20.0, 4.0));
    r.feed(fix(99.0, 99.0, 50.0));

    assert_eq!(r.advance_ms(50_000), Phase::Complete);
    let outcome = r.session.outcome().unwrap().clone().unwrap();
    assert_abs_diff_eq!(outcome.latitude, 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(outcome.longitude, 4.0, epsilon = 1e-12);
    assert_eq!(outcome.samples_used, 2);
    assert_eq!(outcome.samples_discarded, 1);
    assert_eq!(outcome.duration, Duration::from_secs(60));

    assert_eq!(r.last(), Some(Callback::Success(outcome)));
    assert_eq!(r.gps.active_watches(), 0);
}

#[test]
fn fix_delivered_after_deadline_is_not_counted() {
    let mut r = rig(SessionConfig::default());
    r.advance_ms(30_000);
    r.feed(fix(1.0, 1.0, 3.0));
    r.clock.advance_ms(60_000);
    assert!(r.gps.emit_fix(fix(50.0, 50.0, 1.0)));
    assert_eq!(r.session.pump(), Phase::Complete);
    assert_eq!(r.session.outcome().unwrap().as_ref().unwrap().samples_used, 1);
}

#[test]
fn warmup_fix_drained_after_warmup_is_still_ignored() {
    let mut r = rig(SessionConfig::default());
    r.clock.advance_ms(29_999);
    assert!(r.gps.emit_fix(fix(1.0, 2.0, 3.0)));
    r.clock.advance_ms(1);
    assert_eq!(r.session.pump(), Phase::Collecting);
    assert_eq!(r.session.accepted().len(), 0);
    assert_eq!(r.session.discarded(), 0);

    assert_eq!(r.advance_ms(60_000), Phase::Failed);
    assert!(matches!(
        r.session.outcome(),
        Some(Err(CoordError::PositionUnavailable(_)))
    ));
}

#[test]
fn collection_fix_drained_after_deadline_still_counts() {
    let mut r = rig(SessionConfig::default());
    r.advance_ms(30_000);
    r.clock.advance_ms(59_999);
    assert!(r.gps.emit_fix(fix(1.0, 2.0, 3.0)));
    r.clock.advance_ms(5);
    assert_eq!(r.session.pump(), Phase::Complete);
    let outcome = r.session.outcome().unwrap().as_ref().unwrap();
    assert_eq!(outcome.samples_used, 1);
    assert_eq!((outcome.latitude, outcome.longitude), (1.0, 2.0));
}

#[test]
fn progress_is_periodic_and_ordered() {
    let mut r = rig(SessionConfig::default());
    for _ in 0..4 {
        r.advance_ms(500);
    }
    let p = r.seen.progress();
    assert_eq!(p.len(), 5);
    assert!(p.windows(2).all(|w| w[0].elapsed <= w[1].elapsed));
    assert_eq!(p[4].warmup_remaining, Some(Duration::from_millis(28_000)));
}

#[test]
fn cancel_stops_callbacks_and_releases_watch() {
    let mut r = rig(SessionConfig::default());
    r.advance_ms(30_000);
    r.feed(fix(1.0, 1.0, 3.0));
    let before = r.seen.len();

    r.session.cancel().unwrap();
    assert_eq!(r.session.phase(), Phase::Cancelled);
    assert_eq!(r.gps.active_watches(), 0);
    assert!(!r.gps.emit_fix(fix(2.0, 2.0, 1.0)));
    assert!(r.session.accepted().is_empty());

    r.advance_ms(120_000);
    r.session.dispatch(SessionEvent::Fix(fix(2.0, 2.0, 1.0))).unwrap();
    assert_eq!(r.seen.len(), before);
    assert!(r.session.outcome().is_none());

    // idempotent
    r.session.cancel().unwrap();
    assert_eq!(r.session.phase(), Phase::Cancelled);
}

#[test]
fn provider_error_aborts_without_partial_result() {
    let mut r = rig(SessionConfig::default());
    r.advance_ms(30_000);
    r.feed(fix(1.0, 1.0, 3.0));
    assert!(r.gps.emit_error(LocationError::permission_denied("denied")));
    assert_eq!(r.session.pump(), Phase::Failed);
    assert_eq!(r.gps.active_watches(), 0);
    match r.last() {
        Some(Callback::Error(CoordError::Provider(e))) => {
            assert_eq!(e.code, LocationErrorCode::PermissionDenied);
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    let successes = r
        .seen
        .callbacks()
        .iter()
        .filter(|c| matches!(c, Callback::Success(_)))
        .count();
    assert_eq!(successes, 0);
}

#[test]
fn refused_watch_fails_session() {
    let clock = ManualClock::new();
    let (provider, gps) = ScriptedProvider::new();
    gps.refuse_next_watch(LocationError::unavailable("no receiver"));
    let seen = RecordingObserver::new();
    let s = SamplingSession::start(
        provider,
        Arc::new(clock),
        SessionConfig::default(),
        Box::new(seen.clone()),
    )
    .unwrap();
    assert_eq!(s.phase(), Phase::Failed);
    assert_eq!(seen.len(), 1);
    assert!(matches!(
        seen.callbacks()[0],
        Callback::Error(CoordError::Provider(_))
    ));
}

#[test]
fn invalid_config_is_rejected_synchronously() {
    let (provider, gps) = ScriptedProvider::new();
    let cfg = SessionConfig {
        max_accuracy_m: f64::NAN,
        ..SessionConfig::default()
    };
    let err = SamplingSession::start(provider, Arc::new(ManualClock::new()), cfg, Box::new(()))
        .err()
        .unwrap();
    assert!(matches!(err, CoordError::InvalidArgument(_)));
    assert_eq!(gps.watch_requests(), 0);
}

#[test]
fn zero_warmup_starts_collecting() {
    let r = rig(SessionConfig {
        warmup: Duration::ZERO,
        ..SessionConfig::default()
    });
    assert_eq!(r.session.phase(), Phase::Collecting);
}

#[test]
fn review_then_extension_batch() {
    let mut r = rig(review_config());
    r.advance_ms(30_000);
    r.feed(fix(1.0, 1.0, 3.0));
    r.feed(fix(2.0, 2.0, 3.0));
    assert_eq!(r.advance_ms(60_000), Phase::Review);
    assert_eq!(r.session.target_samples(), Some(2));
    assert_eq!(r.gps.active_watches(), 0);

    r.session.extend_by_batch().unwrap();
    assert_eq!(r.session.phase(), Phase::Extending);
    assert_eq!(r.session.target_samples(), Some(5));
    assert_eq!(r.gps.capture_requests(), 1);
    assert_eq!(
        r.gps.last_options().unwrap().timeout,
        Duration::from_millis(10_000)
    );

    // serial: next request only after the answer plus the interval
    assert!(r.gps.answer_capture(Ok(fix(3.0, 3.0, 3.0))));
    r.session.pump();
    assert_eq!(r.session.accepted().len(), 3);
    r.advance_ms(4_999);
    assert_eq!(r.gps.capture_requests(), 1);
    r.advance_ms(1);
    assert_eq!(r.gps.capture_requests(), 2);

    // rejected capture lowers the target
    assert!(r.gps.answer_capture(Ok(fix(9.0, 9.0, 25.0))));
    r.session.pump();
    assert_eq!(r.session.discarded(), 1);
    assert_eq!(r.session.target_samples(), Some(4));

    r.advance_ms(5_000);
    assert!(r.gps.answer_capture(Ok(fix(4.0, 4.0, 3.0))));
    assert_eq!(r.session.pump(), Phase::Review);
    assert_eq!(r.session.accepted().len(), 4);
    assert_eq!(r.gps.pending_captures(), 0);

    r.session.confirm().unwrap();
    let outcome = r.session.outcome().unwrap().clone().unwrap();
    assert_eq!(outcome.samples_used, 4);
    assert_eq!(outcome.samples_discarded, 1);
    assert_eq!(outcome.duration, Duration::from_secs(70));
    assert_abs_diff_eq!(outcome.latitude, 2.5, epsilon = 1e-12);
}

#[test]
fn remove_sample_recomputes_and_adjusts_target() {
    let mut r = rig(review_config());
    r.advance_ms(30_000);
    r.feed(fix(0.0, 0.0, 1.0));
    r.feed(fix(100.0, 100.0, 1.0));
    r.feed(fix(2.0, 2.0, 1.0));
    r.advance_ms(60_000);
    assert_eq!(r.session.target_samples(), Some(3));

    r.session.remove_sample(1).unwrap();
    assert_eq!(r.session.target_samples(), Some(2));
    let avg = r.session.average().unwrap();
    assert_abs_diff_eq!(avg.latitude, 1.0, epsilon = 1e-12);
    let p = r.seen.progress().last().cloned().unwrap();
    assert_eq!(p.samples_accepted, 2);
    assert_eq!(p.target_samples, Some(2));

    let err = r.session.remove_sample(2).unwrap_err();
    assert!(matches!(err, CoordError::InvalidArgument(_)));
}

#[test]
fn removing_every_sample_then_confirming_fails() {
    let mut r = rig(review_config());
    r.advance_ms(30_000);
    r.feed(fix(0.0, 0.0, 1.0));
    r.advance_ms(60_000);
    r.session.remove_sample(0).unwrap();
    r.session.confirm().unwrap();
    assert_eq!(r.session.phase(), Phase::Failed);
    assert!(matches!(
        r.last(),
        Some(Callback::Error(CoordError::PositionUnavailable(_)))
    ));
}

#[test]
fn remove_during_collection_keeps_target_unset() {
    let mut r = rig(SessionConfig::default());
    r.advance_ms(30_000);
    r.feed(fix(0.0, 0.0, 1.0));
    r.feed(fix(4.0, 4.0, 1.0));
    r.session.remove_sample(0).unwrap();
    assert_eq!(r.session.target_samples(), None);
    assert_eq!(r.session.average().unwrap().latitude, 4.0);
}

#[test]
fn commands_invalid_for_phase_are_rejected() {
    let mut r = rig(review_config());
    assert!(matches!(
        r.session.remove_sample(0),
        Err(CoordError::InvalidState(_))
    ));
    assert!(matches!(
        r.session.extend_by_batch(),
        Err(CoordError::InvalidState(_))
    ));
    assert!(matches!(r.session.confirm(), Err(CoordError::InvalidState(_))));
    assert!(matches!(
        r.session.dispatch(SessionEvent::Capture(Ok(fix(0.0, 0.0, 1.0)))),
        Err(CoordError::InvalidState(_))
    ));
    assert_eq!(r.session.phase(), Phase::Warmup);
}

#[test]
fn capture_failure_aborts_extension() {
    let mut r = rig(review_config());
    r.advance_ms(30_000);
    r.feed(fix(0.0, 0.0, 1.0));
    r.advance_ms(60_000);
    r.session.extend_by_batch().unwrap();
    assert!(r.gps.answer_capture(Err(LocationError::unavailable("lost fix"))));
    assert_eq!(r.session.pump(), Phase::Failed);
    assert!(matches!(
        r.session.outcome(),
        Some(Err(CoordError::Provider(e))) if e.code == LocationErrorCode::PositionUnavailable
    ));
}

#[test]
fn capture_timeout_aborts_extension() {
    let mut r = rig(review_config());
    r.advance_ms(30_000);
    r.feed(fix(0.0, 0.0, 1.0));
    r.advance_ms(60_000);
    r.session.extend_by_batch().unwrap();
    assert_eq!(r.advance_ms(10_000), Phase::Failed);
    assert!(matches!(
        r.session.outcome(),
        Some(Err(CoordError::Provider(e))) if e.code == LocationErrorCode::Timeout
    ));
    // a late answer is dropped silently
    let n = r.seen.len();
    assert!(r.gps.answer_capture(Ok(fix(1.0, 1.0, 1.0))));
    r.session.pump();
    assert_eq!(r.seen.len(), n);
}

#[test]
fn dropping_a_running_session_clears_the_watch() {
    let r = rig(SessionConfig::default());
    let gps = r.gps.clone();
    assert_eq!(gps.active_watches(), 1);
    drop(r);
    assert_eq!(gps.active_watches(), 0);
}
