use super::{GovernorError, ManualClock, Quota, RateGovernor, ShardedStore};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

const HOUR_MS: u64 = 3_600_000;

fn governor_at(millis: u64) -> (Arc<ManualClock>, RateGovernor<ShardedStore, Arc<ManualClock>>) {
    let clock = Arc::new(ManualClock::from_millis(millis));
    let governor = RateGovernor::with_clock(Arc::clone(&clock));
    (clock, governor)
}

#[test]
fn test_first_request_is_admitted() {
    let (_clock, governor) = governor_at(0);

    for max in [1, 2, 3, 10, 1000] {
        let key = format!("fresh:{max}");
        let admission = governor
            .admit(&key, max, Duration::from_secs(60))
            .unwrap();
        assert!(admission.success);
        assert_eq!(admission.remaining, max - 1);
        assert_eq!(
            admission.reset_time,
            UNIX_EPOCH + Duration::from_secs(60)
        );
    }
}

#[test]
fn test_public_quota_scenario() {
    // 3 per hour; calls 1-4 at t=0, call 5 just after the window closes
    let (clock, governor) = governor_at(0);
    let window = Duration::from_millis(HOUR_MS);
    let first_reset = UNIX_EPOCH + window;

    for expected in [2, 1, 0] {
        let admission = governor.admit("1.2.3.4", 3, window).unwrap();
        assert!(admission.success);
        assert_eq!(admission.remaining, expected);
        assert_eq!(admission.reset_time, first_reset);
    }

    let rejected = governor.admit("1.2.3.4", 3, window).unwrap();
    assert!(!rejected.success);
    assert_eq!(rejected.remaining, 0);
    assert_eq!(rejected.reset_time, first_reset);

    clock.advance(Duration::from_millis(HOUR_MS + 1));
    let renewed = governor.admit("1.2.3.4", 3, window).unwrap();
    assert!(renewed.success);
    assert_eq!(renewed.remaining, 2);
    assert_eq!(
        renewed.reset_time,
        UNIX_EPOCH + Duration::from_millis(HOUR_MS + 1 + HOUR_MS)
    );
}

#[test]
fn test_rejection_does_not_mutate_record() {
    let (_clock, governor) = governor_at(5_000);
    let window = Duration::from_secs(60);

    governor.admit("key", 2, window).unwrap();
    governor.admit("key", 2, window).unwrap();
    let before = governor.record("key").unwrap();

    for _ in 0..5 {
        let admission = governor.admit("key", 2, window).unwrap();
        assert!(!admission.success);
        assert_eq!(admission.reset_time, before.reset_time);
    }

    assert_eq!(governor.record("key"), Some(before));
    assert_eq!(before.count, 2);
}

#[test]
fn test_window_still_open_at_reset_instant() {
    let (clock, governor) = governor_at(0);
    let window = Duration::from_millis(HOUR_MS);

    assert!(governor.admit("edge", 1, window).unwrap().success);

    // now == reset_time: still inside the window
    clock.advance(window);
    let admission = governor.admit("edge", 1, window).unwrap();
    assert!(!admission.success);

    clock.advance(Duration::from_millis(1));
    assert!(governor.admit("edge", 1, window).unwrap().success);
}

#[test]
fn test_window_does_not_slide_on_admission() {
    let (clock, governor) = governor_at(0);
    let window = Duration::from_secs(100);

    let first = governor.admit("key", 5, window).unwrap();
    clock.advance(Duration::from_secs(50));
    let second = governor.admit("key", 5, window).unwrap();

    assert_eq!(first.reset_time, second.reset_time);
    assert_eq!(second.remaining, 3);
}

#[test]
fn test_boundary_burst_is_allowed() {
    // A full quota just before the boundary and another just after
    let (clock, governor) = governor_at(0);
    let window = Duration::from_secs(60);

    clock.advance(Duration::from_secs(59));
    for _ in 0..3 {
        assert!(governor.admit("burst", 3, window).unwrap().success);
    }
    assert!(!governor.admit("burst", 3, window).unwrap().success);

    // The window opened at t=59 and closes at t=119
    clock.advance(Duration::from_millis(60_001));
    for _ in 0..3 {
        assert!(governor.admit("burst", 3, window).unwrap().success);
    }
}

#[test]
fn test_different_identifiers_are_independent() {
    let (_clock, governor) = governor_at(0);
    let window = Duration::from_secs(60);

    assert!(governor.admit("a", 1, window).unwrap().success);
    assert!(!governor.admit("a", 1, window).unwrap().success);

    let b = governor.admit("b", 1, window).unwrap();
    assert!(b.success);
    assert_eq!(b.remaining, 0);
    assert_eq!(governor.len(), 2);
}

#[test]
fn test_call_site_quotas_are_kept_apart() {
    let (_clock, governor) = governor_at(0);
    let public = Quota::per_hour(3);
    let generic = Quota::default();

    assert_eq!(generic.max_requests, 10);
    assert_eq!(generic.window, Duration::from_secs(3600));

    let a = governor
        .admit("public:1", public.max_requests, public.window)
        .unwrap();
    let b = governor
        .admit("generic:1", generic.max_requests, generic.window)
        .unwrap();
    assert_eq!(a.remaining, 2);
    assert_eq!(b.remaining, 9);
}

#[test]
fn test_invalid_quota_is_rejected() {
    let governor = RateGovernor::new();

    assert_eq!(
        governor.admit("key", 0, Duration::from_secs(60)),
        Err(GovernorError::InvalidQuota {
            max_requests: 0,
            window: Duration::from_secs(60)
        })
    );
    assert!(governor.admit("key", 5, Duration::ZERO).is_err());
    assert!(governor.is_empty());
}

#[test]
fn test_window_past_the_clock_range_is_rejected() {
    let (_clock, governor) = governor_at(0);
    let window = Duration::from_secs(u64::MAX);

    assert_eq!(
        governor.admit("key", 3, window),
        Err(GovernorError::InvalidQuota {
            max_requests: 3,
            window,
        })
    );
    assert!(governor.record("key").is_none());

    // An open record is left alone
    governor.admit("key", 3, Duration::from_secs(60)).unwrap();
    assert!(governor.admit("key", 3, window).is_err());
    assert_eq!(governor.record("key").map(|r| r.count), Some(1));
}

#[test]
fn test_sweep_removes_only_expired_records() {
    let (clock, governor) = governor_at(0);

    governor.admit("short", 5, Duration::from_secs(10)).unwrap();
    governor.admit("long", 5, Duration::from_secs(1000)).unwrap();

    clock.advance(Duration::from_secs(10));
    assert_eq!(governor.sweep(), 0);
    assert_eq!(governor.len(), 2);

    clock.advance(Duration::from_secs(1));
    assert_eq!(governor.sweep(), 1);
    assert!(governor.record("short").is_none());
    assert!(governor.record("long").is_some());
}

#[test]
fn test_expired_record_replaced_without_sweep() {
    let (clock, governor) = governor_at(0);
    let window = Duration::from_secs(10);

    governor.admit("lazy", 2, window).unwrap();
    governor.admit("lazy", 2, window).unwrap();

    clock.advance(Duration::from_secs(11));
    let admission = governor.admit("lazy", 2, window).unwrap();
    assert!(admission.success);
    assert_eq!(admission.remaining, 1);
    assert_eq!(governor.record("lazy").unwrap().count, 1);
}

#[test]
fn test_concurrent_requests_never_over_admit() {
    let (_clock, governor) = governor_at(0);
    let governor = Arc::new(governor);
    let threads = 32;
    let per_thread = 8;
    let max = 10;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let governor = Arc::clone(&governor);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_thread)
                    .filter(|_| {
                        governor
                            .admit("contended", max, Duration::from_secs(60))
                            .unwrap()
                            .success
                    })
                    .count()
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(admitted, max as usize);
    assert_eq!(governor.record("contended").unwrap().count, max);
}

#[test]
fn test_concurrent_distinct_identifiers() {
    let governor = Arc::new(RateGovernor::new());

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let governor = Arc::clone(&governor);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("client:{t}:{i}");
                    let admission = governor
                        .admit(&key, 1, Duration::from_secs(60))
                        .unwrap();
                    assert!(admission.success);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(governor.len(), 1600);
}
