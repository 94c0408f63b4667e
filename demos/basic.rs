use metronome::{current, Timer};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> metronome::Result<()> {
    tracing_subscriber::fmt::init();

    let event_loop = current()?;
    println!("resolved {} backend", event_loop.kind());

    let ticks = Arc::new(AtomicU32::new(0));

    let count = ticks.clone();
    let stopper = event_loop.clone();
    let heartbeat = Timer::periodic(&event_loop, Duration::from_millis(500), move || {
        let tick = count.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[HEARTBEAT] tick #{tick} (every 500ms)");
        if tick == 5 {
            stopper.stop();
        }
    });

    let greeting = Timer::one_shot(&event_loop, Duration::from_millis(200), || {
        println!("[ONE-SHOT] fires exactly once, 200ms in");
    });

    heartbeat.start();
    greeting.start();

    event_loop.run()?;
    println!("loop stopped after {} ticks", ticks.load(Ordering::SeqCst));
    Ok(())
}
