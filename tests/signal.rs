use s3access::{CompletionSignal, DoneGuard, SignalError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn concurrent_done_releases_every_waiter_once() {
    const TASKS: usize = 64;
    const WAITERS: usize = 4;

    let signal = Arc::new(CompletionSignal::new());
    let finished = Arc::new(AtomicUsize::new(0));
    signal.add(TASKS);

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let signal = Arc::clone(&signal);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                signal.wait(Duration::from_secs(10)).unwrap();
                // Never early: every task has reported by the time a waiter wakes.
                assert_eq!(finished.load(Ordering::SeqCst), TASKS);
            })
        })
        .collect();

    let start = Arc::new(Barrier::new(TASKS));
    let tasks: Vec<_> = (0..TASKS)
        .map(|_| {
            let signal = Arc::clone(&signal);
            let finished = Arc::clone(&finished);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                finished.fetch_add(1, Ordering::SeqCst);
                signal.done().unwrap();
            })
        })
        .collect();

    for t in tasks {
        t.join().unwrap();
    }
    for w in waiters {
        w.join().unwrap();
    }
    assert_eq!(signal.outstanding(), 0);
    assert_eq!(signal.completions(), 1);
    assert_eq!(signal.done(), Err(SignalError::Underflow));
}

#[test]
fn signal_can_be_reused_after_reaching_zero() {
    let signal = CompletionSignal::new();
    for round in 1..=3 {
        signal.add(2);
        signal.done().unwrap();
        assert!(signal.wait(Duration::from_millis(10)).is_err());
        signal.done().unwrap();
        signal.wait(Duration::from_secs(1)).unwrap();
        assert_eq!(signal.completions(), round);
    }
}

#[test]
fn panicking_task_still_resolves_its_slot() {
    let signal = Arc::new(CompletionSignal::new());
    signal.add(2);

    let ok = {
        let guard = DoneGuard::new(Arc::clone(&signal));
        thread::spawn(move || drop(guard))
    };
    let boom = {
        let guard = DoneGuard::new(Arc::clone(&signal));
        thread::spawn(move || {
            let _guard = guard;
            panic!("task failed");
        })
    };

    ok.join().unwrap();
    assert!(boom.join().is_err());
    signal.wait(Duration::from_secs(5)).unwrap();
    assert_eq!(signal.completions(), 1);
}

#[test]
fn timeout_leaves_tasks_running() {
    let signal = Arc::new(CompletionSignal::new());
    signal.add(1);
    let slow = {
        let signal = Arc::clone(&signal);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            signal.done().unwrap();
        })
    };

    let err = signal.wait(Duration::from_millis(20)).unwrap_err();
    assert_eq!(
        err,
        SignalError::Timeout {
            timeout: Duration::from_millis(20),
            outstanding: 1
        }
    );

    slow.join().unwrap();
    assert_eq!(signal.outstanding(), 0);
    assert_eq!(signal.completions(), 1);
}
