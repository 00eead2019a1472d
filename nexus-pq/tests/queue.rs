use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use nexus_pq::{
    BlockingLock, CancelToken, PriorityQueue, QueueConfig, RawLock, Reversed, SpinLock,
    compare::Natural,
};

const PRODUCERS: u64 = 4;
const CONSUMERS: usize = 4;
const PER_PRODUCER: u64 = 10_000;

fn queue<L: RawLock + Default>(limit: usize) -> Arc<PriorityQueue<u64, Natural, L>> {
    let config = QueueConfig::new(Natural)
        .with_limit(limit)
        .with_lock(L::default());
    Arc::new(PriorityQueue::new(config).unwrap())
}

// =============================================================================
// Conservation - every pushed element is popped or returned by close, once
// =============================================================================

fn run_mpmc<L: RawLock + Default + 'static>(limit: usize) {
    let queue = queue::<L>(limit);
    let accepted = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    // Unique values across producers.
                    let mut value = p * PER_PRODUCER + i;
                    loop {
                        match queue.try_push(value) {
                            Ok(()) => {
                                accepted.fetch_add(1, Ordering::Relaxed);
                                break;
                            }
                            Err(rejected) if !queue.is_closed() => {
                                value = rejected.into_inner();
                                thread::yield_now();
                            }
                            Err(_) => return,
                        }
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(x) = queue.pop() {
                    got.push(x);
                }
                got
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    let rest = queue.close();

    let mut seen = HashSet::new();
    for c in consumers {
        for x in c.join().unwrap() {
            assert!(seen.insert(x), "duplicate pop of {x}");
        }
    }
    for &x in rest.iter() {
        assert!(seen.insert(x), "{x} popped and also returned by close");
    }

    assert_eq!(seen.len(), accepted.load(Ordering::Relaxed));
    assert_eq!(seen.len() as u64, PRODUCERS * PER_PRODUCER);
}

#[test]
fn mpmc_unbounded_spin() {
    run_mpmc::<SpinLock>(0);
}

#[test]
fn mpmc_bounded_spin() {
    run_mpmc::<SpinLock>(16);
}

#[test]
fn mpmc_bounded_blocking() {
    run_mpmc::<BlockingLock>(16);
}

#[test]
fn close_during_traffic_loses_nothing() {
    let queue = queue::<SpinLock>(64);
    let accepted = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                let mut i = 0;
                while !queue.is_closed() {
                    if queue.try_push(p * 1_000_000 + i).is_ok() {
                        accepted.fetch_add(1, Ordering::Relaxed);
                        i += 1;
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut got = Vec::new();
                // Slow enough that the queue fills up and close has work.
                while !stop.load(Ordering::Relaxed) {
                    match queue.pop() {
                        Some(x) => got.push(x),
                        None => break,
                    }
                    if got.len() % 8 == 0 {
                        thread::sleep(Duration::from_micros(50));
                    }
                }
                got
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    let rest = queue.close();
    stop.store(true, Ordering::Relaxed);

    for p in producers {
        p.join().unwrap();
    }

    let mut total = rest.len();
    let mut seen: HashSet<u64> = rest.iter().copied().collect();
    for c in consumers {
        let got = c.join().unwrap();
        total += got.len();
        seen.extend(got);
    }

    assert_eq!(total, seen.len(), "an element was delivered twice");
    assert_eq!(total, accepted.load(Ordering::Relaxed));

    // Nothing is accepted after close returns.
    assert!(queue.try_push(1).is_err());
    assert!(queue.is_empty());
}

// =============================================================================
// Close
// =============================================================================

#[test]
fn close_snapshot_is_descending() {
    let queue = queue::<SpinLock>(0);
    for x in [12, 4, 99, 4, 31, 0, 7] {
        queue.try_push(x).unwrap();
    }

    assert_eq!(&*queue.close(), &[99, 31, 12, 7, 4, 4, 0]);
}

#[test]
fn close_snapshot_follows_comparator() {
    let queue = PriorityQueue::with_comparator(Reversed(Natural));
    for x in [12, 4, 99] {
        queue.try_push(x).unwrap();
    }

    // "Descending priority" under a reversed order is ascending value.
    assert_eq!(&*queue.close(), &[4, 12, 99]);
}

#[test]
fn concurrent_close_is_idempotent() {
    let queue = queue::<SpinLock>(0);
    for x in 0..1000 {
        queue.try_push(x).unwrap();
    }

    let barrier = Arc::new(Barrier::new(8));
    let closers: Vec<_> = (0..8)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                queue.close()
            })
        })
        .collect();

    let snapshots: Vec<_> = closers.into_iter().map(|h| h.join().unwrap()).collect();
    let expected: Vec<u64> = (0..1000).rev().collect();
    for s in &snapshots {
        assert_eq!(&**s, &expected[..]);
    }

    // Later callers get the same snapshot too.
    assert!(Arc::ptr_eq(&queue.close(), &snapshots[0]));
}

#[test]
fn close_unblocks_every_popper() {
    let queue = queue::<BlockingLock>(0);

    let poppers: Vec<_> = (0..8)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    assert!(queue.close().is_empty());

    for p in poppers {
        assert_eq!(p.join().unwrap(), None);
    }
}

/// Stalls the next comparison until the test lets it go.
struct Gate {
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            armed: AtomicBool::new(false),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        })
    }

    fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
    }
}

#[test]
fn close_waits_for_push_already_in_flight() {
    let gate = Gate::new();
    let cmp = {
        let gate = Arc::clone(&gate);
        move |a: &u64, b: &u64| {
            gate.pass();
            a.cmp(b)
        }
    };
    let queue = Arc::new(PriorityQueue::<u64, _>::with_comparator(cmp));

    // First push into an empty heap compares nothing.
    queue.try_push(1).unwrap();

    gate.armed.store(true, Ordering::SeqCst);
    let pusher = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.try_push(2))
    };
    // The pusher is now stalled inside its sift-up.
    gate.entered.wait();

    let finished = Arc::new(AtomicBool::new(false));
    let closer = {
        let queue = Arc::clone(&queue);
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            let rest = queue.close();
            finished.store(true, Ordering::SeqCst);
            rest
        })
    };

    while !queue.is_closed() {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(50));
    assert!(!finished.load(Ordering::SeqCst), "close finalized under a live push");

    // Pushes arriving now are refused.
    assert!(queue.try_push(3).is_err());

    gate.release.wait();
    assert!(pusher.join().unwrap().is_ok());
    assert_eq!(&*closer.join().unwrap(), &[2, 1]);
}

#[test]
fn polling_callers_do_not_hold_up_close() {
    let queue = queue::<SpinLock>(0);
    let stop = Arc::new(AtomicBool::new(false));

    let pollers: Vec<_> = (0..8u64)
        .map(|i| {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    match i % 3 {
                        0 => {
                            let _ = queue.try_pop();
                        }
                        1 => {
                            let _ = queue.pop_timeout(Duration::from_micros(20));
                        }
                        _ => {
                            let _ = queue.try_push(i);
                        }
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    let start = Instant::now();
    let rest = queue.close();
    let elapsed = start.elapsed();

    stop.store(true, Ordering::Relaxed);
    for p in pollers {
        p.join().unwrap();
    }

    assert!(elapsed < Duration::from_secs(5), "close took {elapsed:?}");
    assert!(Arc::ptr_eq(&rest, &queue.close()));
    assert!(queue.is_empty());
}

// =============================================================================
// Cancellation and timeouts
// =============================================================================

#[test]
fn one_token_cancels_many_poppers() {
    let queue = queue::<SpinLock>(0);
    let token = CancelToken::new();

    let poppers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let token = token.clone();
            thread::spawn(move || queue.pop_cancellable(&token))
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    token.cancel();

    for p in poppers {
        assert_eq!(p.join().unwrap(), None);
    }

    // Cancellation is per-call, the queue stays open.
    assert!(!queue.is_closed());
    queue.try_push(3).unwrap();
    assert_eq!(queue.pop_cancellable(&CancelToken::new()), Some(3));
}

#[test]
fn cancelling_one_popper_leaves_others_waiting() {
    let queue = queue::<SpinLock>(0);
    let cancelled = CancelToken::new();

    let quitter = {
        let queue = Arc::clone(&queue);
        let token = cancelled.clone();
        thread::spawn(move || queue.pop_cancellable(&token))
    };
    let stayer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.pop())
    };

    thread::sleep(Duration::from_millis(20));
    cancelled.cancel();
    assert_eq!(quitter.join().unwrap(), None);

    queue.try_push(42).unwrap();
    assert_eq!(stayer.join().unwrap(), Some(42));
}

#[test]
fn pop_timeout_gives_up() {
    let queue = queue::<SpinLock>(0);

    let start = Instant::now();
    assert_eq!(queue.pop_timeout(Duration::from_millis(30)), None);
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert!(!queue.is_closed());
}

#[test]
fn pop_timeout_zero_is_try_pop() {
    let queue = queue::<SpinLock>(0);
    assert_eq!(queue.pop_timeout(Duration::ZERO), None);

    queue.try_push(8).unwrap();
    assert_eq!(queue.pop_timeout(Duration::ZERO), Some(8));
}

// =============================================================================
// Wakeups
// =============================================================================

#[test]
fn each_push_wakes_a_popper() {
    let queue = queue::<SpinLock>(0);

    let poppers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    for x in 1..=4 {
        queue.try_push(x).unwrap();
    }

    let mut got: Vec<u64> = poppers.into_iter().map(|p| p.join().unwrap().unwrap()).collect();
    got.sort_unstable();
    assert_eq!(got, vec![1, 2, 3, 4]);
    assert!(!queue.is_closed());
}
