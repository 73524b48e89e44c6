use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cabinet_core::error::Error;
use cabinet_core::timer::TimerQueue;

// ==========================================================================
// Periodic timers
// ==========================================================================

#[test]
fn test_periodic_timer_does_not_drift_under_irregular_steps() {
    let mut rng = StdRng::seed_from_u64(0x5EED_CAB1);
    let mut q = TimerQueue::new();
    q.schedule(100, 100, "tick");

    let mut fired = Vec::new();
    while q.now() < 100_000 {
        let step = rng.gen_range(1..=537);
        q.advance(step, |_, f| fired.push(f.time));
    }

    let expected: Vec<u64> = (1..=q.now() / 100).map(|k| k * 100).collect();
    assert_eq!(fired, expected);
}

#[test]
fn test_periodic_timer_fires_every_period_inside_one_long_advance() {
    let mut q = TimerQueue::new();
    q.schedule(10, 25, ());
    let mut times = Vec::new();
    q.advance(100, |_, f| {
        assert!(f.rescheduled);
        times.push(f.time);
    });
    assert_eq!(times, vec![10, 35, 60, 85]);
}

#[test]
fn test_equal_deadlines_fire_in_insertion_order() {
    let mut q = TimerQueue::new();
    let mut rng = StdRng::seed_from_u64(7);
    let mut expected = Vec::new();
    for i in 0..50u32 {
        let delay = rng.gen_range(0..5u64) * 10;
        q.schedule(delay, 0, (delay, i));
        expected.push((delay, i));
    }
    expected.sort_by_key(|&(delay, i)| (delay, i));

    let mut order = Vec::new();
    q.advance(50, |_, f| order.push(f.payload));
    assert_eq!(order, expected);
}

// ==========================================================================
// Cancellation
// ==========================================================================

#[test]
fn test_cancel_before_fire_suppresses_callback() {
    let mut q = TimerQueue::new();
    let h = q.schedule(100, 0, 1u8);
    q.advance(99, |_, _| panic!("fired early"));
    assert_eq!(q.cancel(h), Ok(true));
    let fired = q.advance(1_000, |_, _| panic!("cancelled timer fired"));
    assert_eq!(fired, 0);
    assert!(!q.is_scheduled(h));
}

#[test]
fn test_cancel_after_fire_is_a_no_op() {
    let mut q = TimerQueue::new();
    let h = q.schedule(10, 0, 1u8);
    let other = q.schedule(20, 0, 2u8);
    let mut seen = Vec::new();
    q.advance(15, |_, f| seen.push(f.payload));
    assert_eq!(q.cancel(h), Ok(false));
    q.advance(10, |_, f| seen.push(f.payload));
    assert_eq!(seen, vec![1, 2]);
    assert_eq!(q.cancel(other), Ok(false));
}

#[test]
fn test_cancel_periodic_from_its_own_callback() {
    let mut q = TimerQueue::new();
    let h = q.schedule(5, 5, ());
    let mut count = 0;
    q.advance(100, |q, f| {
        count += 1;
        if count == 3 {
            assert_eq!(q.cancel(f.handle), Ok(true));
        }
    });
    assert_eq!(count, 3);
    assert!(!q.is_scheduled(h));
}

#[test]
fn test_handle_from_another_queue_is_invalid() {
    let mut a = TimerQueue::<()>::new();
    let mut b = TimerQueue::<()>::new();
    a.schedule(1, 0, ());
    let h = a.schedule(1, 0, ());
    assert_eq!(b.cancel(h), Err(Error::InvalidTimerHandle(h.id())));
}
