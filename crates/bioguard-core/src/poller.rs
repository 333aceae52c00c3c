//! Fixed-period read trigger.
//!
//! The analyzer pushes notifications on its own, but the client also asks
//! for the current value on a fixed cadence. Each tick spawns its read
//! independently, so a slow read never delays the next tick and overlapping
//! reads are possible.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::SessionEvents;
use crate::traits::{CharacteristicHandle, SensorPeripheral};

/// Default period between read triggers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// A running periodic trigger.
///
/// The first trigger fires one full period after [`Poller::start`].
/// Dropping the poller stops it.
pub struct Poller {
    period: Duration,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Poller {
    /// Start invoking `trigger` every `period`.
    ///
    /// The future returned by each invocation is spawned, not awaited.
    pub fn start<F, Fut>(period: Duration, mut trigger: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        debug!("Poller cancelled, stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        tokio::spawn(trigger());
                    }
                }
            }
        });

        Self {
            period,
            handle,
            cancel_token,
        }
    }

    /// Period between triggers.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Cancel pending and future triggers. Safe to call more than once.
    ///
    /// Reads already spawned by earlier ticks are left to finish.
    pub fn stop(&self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }

    /// Whether the trigger is still scheduled.
    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One poll tick: read the characteristic if the session is up.
///
/// The value goes out through `events` exactly like a notification. A read
/// error is logged and swallowed; the next tick proceeds independently.
pub async fn read_tick(
    peripheral: Arc<dyn SensorPeripheral>,
    characteristic: Option<CharacteristicHandle>,
    connected: Arc<AtomicBool>,
    events: SessionEvents,
) {
    let Some(characteristic) = characteristic else {
        return;
    };
    if !connected.load(Ordering::SeqCst) {
        return;
    }

    match peripheral.read_value(&characteristic).await {
        Ok(data) => events.value(data),
        Err(e) => warn!("Error reading characteristic: {}", e),
    }
}
