//! Any thread can reach the main loop through `instance()` and schedule
//! work onto it; callbacks still execute on the thread driving `run()`.

use metronome::{instance, Timer};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> metronome::Result<()> {
    tracing_subscriber::fmt::init();

    let event_loop = instance()?;
    let fired = Arc::new(AtomicU32::new(0));

    let mut workers = Vec::new();
    for worker in 0..3u32 {
        let fired = fired.clone();
        workers.push(thread::spawn(move || {
            let shared = instance().expect("main loop already resolved");
            let count = fired.clone();
            let stopper = shared.clone();
            let timer = Timer::one_shot(
                &shared,
                Duration::from_millis(50 + 50 * u64::from(worker)),
                move || {
                    let done = count.fetch_add(1, Ordering::SeqCst) + 1;
                    println!("[WORKER {worker}] callback ran on the loop thread");
                    if done == 3 {
                        stopper.stop();
                    }
                },
            );
            timer.start();
        }));
    }
    for worker in workers {
        worker.join().expect("worker thread panicked");
    }

    event_loop.run()?;
    println!("all {} callbacks delivered", fired.load(Ordering::SeqCst));
    Ok(())
}
