//! Background emitter thread shared by the providers.
//!
//! Each `Emitter` owns exactly one thread, stopped and joined on drop, so a
//! cleared watch never leaves a thread behind.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use coordkit_traits::{Clock, ProviderEvent, WatchCallback};

/// Upper bound on how long shutdown can wait for a sleeping thread.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

pub(crate) struct Emitter {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl Emitter {
    /// Every `interval`, ask `next` for an event and hand it to `sink`.
    /// The thread ends when `next` returns `None` or on shutdown.
    pub(crate) fn spawn<F>(
        name: &str,
        interval: Duration,
        clock: Arc<dyn Clock + Send + Sync>,
        mut next: F,
        mut sink: WatchCallback,
    ) -> std::io::Result<Self>
    where
        F: FnMut() -> Option<ProviderEvent> + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    let mut left = interval;
                    while !left.is_zero() {
                        if shutdown_clone.load(Ordering::Relaxed) {
                            break;
                        }
                        let step = left.min(SLEEP_SLICE);
                        clock.sleep(step);
                        left -= step;
                    }
                    if shutdown_clone.load(Ordering::Relaxed) {
                        tracing::debug!("emitter thread received shutdown signal");
                        break;
                    }
                    match next() {
                        Some(ev) => sink(ev),
                        None => {
                            tracing::debug!("emitter source exhausted");
                            break;
                        }
                    }
                }
                tracing::trace!("emitter thread exiting cleanly");
            })?;

        Ok(Self {
            shutdown,
            join_handle: Some(join_handle),
        })
    }
}

impl Drop for Emitter {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("emitter thread joined"),
                Err(e) => tracing::warn!(?e, "emitter thread panicked during shutdown"),
            }
        }
    }
}
