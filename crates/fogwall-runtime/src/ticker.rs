use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};

use crate::clock::is_due;
use crate::engine::BorderEngine;

/// Runs the bounds and light subsystems on their own threads at the
/// configured tick rate until shut down.
pub struct TickDriver {
    engine: Arc<BorderEngine>,
    stop_tx: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl TickDriver {
    pub fn start(engine: Arc<BorderEngine>) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let cfg = engine.config().clone();
        let period = cfg.tick_duration();

        let bounds = {
            let engine = engine.clone();
            let interval = cfg.bounds_update_interval;
            spawn_loop("fogwall-bounds", period, stop_rx.clone(), move || {
                let now = engine.clock().advance();
                if is_due(now, interval) {
                    engine.process_bounds_tick(now);
                }
            })?
        };
        let light = {
            let engine = engine.clone();
            let light_period = period.saturating_mul(u32::try_from(cfg.light_update_interval).unwrap_or(u32::MAX));
            spawn_loop("fogwall-light", light_period, stop_rx, move || {
                engine.process_light_tick(engine.clock().now());
            })?
        };
        log::info!(
            target: "fogwall::ticker",
            "tick drivers started ({} ms/tick, bounds every {}, light every {})",
            cfg.tick_millis,
            cfg.bounds_update_interval,
            cfg.light_update_interval
        );
        Ok(Self {
            engine,
            stop_tx: Some(stop_tx),
            handles: vec![bounds, light],
        })
    }

    /// Stops and joins the tick threads, then restores every player.
    pub fn shutdown(mut self) {
        self.stop_threads();
        self.engine.shutdown();
    }

    fn stop_threads(&mut self) {
        // Dropping the sender disconnects every loop's stop channel.
        self.stop_tx.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!(target: "fogwall::ticker", "tick thread panicked");
            }
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.stop_threads();
    }
}

fn spawn_loop<F>(
    name: &str,
    period: Duration,
    stop: Receiver<()>,
    mut step: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let ticker = tick(period);
        loop {
            select! {
                recv(ticker) -> _ => step(),
                recv(stop) -> _ => break,
            }
        }
    })
}
