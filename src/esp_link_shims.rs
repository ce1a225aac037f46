//! embassy-time driver symbols for ESP-IDF.
//!
//! `now` reads the esp_timer microsecond counter (embassy ticks are
//! microseconds).  Wakeups are served by one background thread that
//! owns a deadline queue, so a pending timer costs a queue entry rather
//! than a thread.

use core::task::Waker;
use core::time::Duration;
use std::sync::{Condvar, Mutex, MutexGuard, Once, PoisonError};

struct WakeQueue {
    pending: Mutex<Vec<(u64, Waker)>>,
    changed: Condvar,
}

static QUEUE: WakeQueue = WakeQueue {
    pending: Mutex::new(Vec::new()),
    changed: Condvar::new(),
};
static WORKER: Once = Once::new();

fn lock() -> MutexGuard<'static, Vec<(u64, Waker)>> {
    QUEUE.pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[unsafe(no_mangle)]
fn _embassy_time_now() -> u64 {
    // SAFETY: esp_timer_get_time only reads the monotonic hardware timer.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

#[unsafe(no_mangle)]
fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
    WORKER.call_once(|| {
        if let Err(e) = std::thread::Builder::new()
            .name("embassy-wake".into())
            .stack_size(3072)
            .spawn(run_worker)
        {
            log::error!("timer wake thread failed to start: {e}");
        }
    });

    let mut pending = lock();
    match pending.iter_mut().find(|(_, w)| w.will_wake(waker)) {
        Some(entry) => entry.0 = entry.0.min(at),
        None => pending.push((at, waker.clone())),
    }
    drop(pending);
    QUEUE.changed.notify_one();
}

fn run_worker() {
    let mut pending = lock();
    loop {
        let now = _embassy_time_now();
        let mut i = 0;
        while i < pending.len() {
            if pending[i].0 <= now {
                pending.swap_remove(i).1.wake();
            } else {
                i += 1;
            }
        }

        pending = match pending.iter().map(|(at, _)| *at).min() {
            None => QUEUE
                .changed
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner),
            Some(at) => {
                QUEUE
                    .changed
                    .wait_timeout(pending, Duration::from_micros(at - now))
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
    }
}
