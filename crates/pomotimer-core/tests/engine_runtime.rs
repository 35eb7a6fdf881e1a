//! End-to-end tests driving the engine with real schedulers.
//!
//! Tokio tests run on a paused clock: the runtime jumps straight to the next
//! timer whenever it is idle, so the sleeps below cost no wall time. Sleeps end
//! half a second past the tick they wait for to keep the ordering unambiguous.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pomotimer_core::{
    Event, ManualScheduler, TimerEngine, TimerMode, TimerStatus, TokioScheduler,
};

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn full_work_session_completes_once() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let engine = TimerEngine::with_callback(TokioScheduler::current().unwrap(), move |mode| {
        sink.lock().unwrap().push(mode);
    });

    engine.start();
    sleep_ms(1_500_500).await;

    let state = engine.state();
    assert_eq!(state.mode, TimerMode::Work);
    assert_eq!(state.status, TimerStatus::Idle);
    assert_eq!(state.remaining_seconds, 0);
    assert_eq!(*calls.lock().unwrap(), vec![TimerMode::Work]);

    sleep_ms(10_000).await;
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_holds_remaining_time() {
    let engine = TimerEngine::new(TokioScheduler::current().unwrap());

    engine.start();
    sleep_ms(3_500).await;
    engine.pause();
    sleep_ms(10_000).await;

    let state = engine.state();
    assert_eq!(state.remaining_seconds, 1497);
    assert_eq!(state.status, TimerStatus::Paused);
}

#[tokio::test(start_paused = true)]
async fn resume_continues_from_paused_time() {
    let engine = TimerEngine::new(TokioScheduler::current().unwrap());

    engine.start();
    sleep_ms(3_500).await;
    engine.pause();

    assert!(matches!(engine.start(), Some(Event::TimerResumed { .. })));
    sleep_ms(2_500).await;

    let state = engine.state();
    assert_eq!(state.remaining_seconds, 1495);
    assert_eq!(state.status, TimerStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn repeated_start_does_not_speed_up() {
    let engine = TimerEngine::new(TokioScheduler::current().unwrap());
    engine.start();
    engine.start();
    engine.start();

    sleep_ms(1_500).await;
    assert_eq!(engine.state().remaining_seconds, 1499);
}

#[tokio::test(start_paused = true)]
async fn reset_stops_the_tick_task() {
    let completed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&completed);
    let engine = TimerEngine::with_callback(TokioScheduler::current().unwrap(), move |_| {
        flag.store(true, Ordering::SeqCst);
    });

    engine.set_custom_time(0, 5);
    engine.start();
    sleep_ms(3_500).await;
    engine.reset();
    sleep_ms(10_000).await;

    let state = engine.state();
    assert_eq!(state.remaining_seconds, 5);
    assert_eq!(state.status, TimerStatus::Idle);
    assert!(!completed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn dropped_engine_stops_ticking() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let engine = TimerEngine::with_callback(TokioScheduler::current().unwrap(), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    engine.set_custom_time(0, 3);
    engine.start();
    drop(engine);

    sleep_ms(5_000).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_polling_sees_consistent_snapshots() {
    let clock = ManualScheduler::new();
    let engine = Arc::new(TimerEngine::new(clock.clone()));
    engine.set_custom_time(0, 50);
    engine.start();

    let driver = {
        let clock = clock.clone();
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || {
            for round in 0..20 {
                clock.advance_secs(60);
                if round % 2 == 0 {
                    engine.reset();
                } else {
                    engine.set_custom_time(0, 50);
                }
                engine.start();
            }
        })
    };

    while !driver.is_finished() {
        let state = engine.state();
        if state.remaining_seconds == 0 {
            assert_eq!(state.status, TimerStatus::Idle);
        }
        assert!(state.remaining_seconds <= 50);
        assert_eq!(state.mode, TimerMode::Custom);
    }
    driver.join().unwrap();
}
