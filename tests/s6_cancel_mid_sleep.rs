//! Scenario S6: cancelling a task mid-`sleep` terminates it promptly and
//! removes it from the registry (spec §8 scenario S6, testable property 10).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cutloop::prelude::*;

#[test]
fn cancel_mid_sleep_terminates_within_tens_of_millis() {
    let _ = env_logger::try_init();

    let clock = TempoClock::new(60.0);
    let cancelled_cleanly = Arc::new(AtomicBool::new(false));
    let flag = cancelled_cleanly.clone();

    let id = clock.run(move |ctx| async move {
        if ctx.sleep(10.0).await.is_err() {
            flag.store(true, Ordering::SeqCst);
        }
    });

    std::thread::sleep(Duration::from_millis(500));
    assert!(clock.is_active(id), "task should still be sleeping at 0.5s");

    clock.cancel(id);
    // cancel() removes the id from the registry synchronously.
    assert!(!clock.is_active(id));

    std::thread::sleep(Duration::from_millis(20));
    assert!(cancelled_cleanly.load(Ordering::SeqCst));
}
