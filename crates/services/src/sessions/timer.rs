use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// Identifies one run of a `CountdownTimer`; bumped on every reset and cancel.
pub type TimerEpoch = u32;

const TICK: Duration = Duration::from_secs(1);

// Epoch in the high 32 bits, remaining seconds in the low 32 bits. A tick
// only lands if its epoch still matches, so a superseded task can never
// touch the count of the run that replaced it.
fn pack(epoch: TimerEpoch, remaining: u32) -> u64 {
    (u64::from(epoch) << 32) | u64::from(remaining)
}

#[allow(clippy::cast_possible_truncation)]
fn unpack(v: u64) -> (TimerEpoch, u32) {
    ((v >> 32) as u32, v as u32)
}

/// Read-only view of a timer's remaining seconds.
#[derive(Debug, Clone)]
pub struct RemainingSecs(Arc<AtomicU64>);

impl RemainingSecs {
    #[must_use]
    pub fn get(&self) -> u32 {
        unpack(self.0.load(Ordering::Acquire)).1
    }
}

type ExpiryCallback = Arc<dyn Fn(TimerEpoch) + Send + Sync>;

/// One-second countdown that invokes a callback once when it reaches zero.
///
/// At most one tick task is alive per timer: `reset` and `cancel` abort the
/// previous task before anything else. The callback receives the epoch of the
/// run that expired so receivers can discard expiries that raced a reset.
///
/// Must be reset from within a tokio runtime.
pub struct CountdownTimer {
    state: Arc<AtomicU64>,
    epoch: TimerEpoch,
    on_expire: ExpiryCallback,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// Creates an idle timer at zero.
    pub fn new(on_expire: impl Fn(TimerEpoch) + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(AtomicU64::new(pack(0, 0))),
            epoch: 0,
            on_expire: Arc::new(on_expire),
            task: None,
        }
    }

    /// Cancels any pending countdown and starts a new one from `duration_secs`.
    ///
    /// Returns the epoch the expiry callback will report for this run.
    pub fn reset(&mut self, duration_secs: u32) -> TimerEpoch {
        self.abort_task();
        self.epoch = self.epoch.wrapping_add(1);
        self.state
            .store(pack(self.epoch, duration_secs), Ordering::Release);

        let epoch = self.epoch;
        let state = Arc::clone(&self.state);
        let on_expire = Arc::clone(&self.on_expire);
        self.task = Some(tokio::spawn(async move {
            if duration_secs == 0 {
                on_expire(epoch);
                return;
            }
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                match tick(&state, epoch) {
                    Some(0) => {
                        on_expire(epoch);
                        return;
                    }
                    Some(_) => {}
                    None => return,
                }
            }
        }));
        epoch
    }

    /// Stops the countdown without firing the callback.
    ///
    /// The remaining count is left where it stopped.
    pub fn cancel(&mut self) {
        self.abort_task();
        let remaining = self.remaining();
        self.epoch = self.epoch.wrapping_add(1);
        self.state
            .store(pack(self.epoch, remaining), Ordering::Release);
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        unpack(self.state.load(Ordering::Acquire)).1
    }

    #[must_use]
    pub fn remaining_handle(&self) -> RemainingSecs {
        RemainingSecs(Arc::clone(&self.state))
    }

    #[must_use]
    pub fn epoch(&self) -> TimerEpoch {
        self.epoch
    }

    /// True while a countdown is ticking.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}

/// Decrements the count if `epoch` is still current; returns the new count.
fn tick(state: &AtomicU64, epoch: TimerEpoch) -> Option<u32> {
    state
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
            let (current, remaining) = unpack(v);
            (current == epoch).then(|| pack(current, remaining.saturating_sub(1)))
        })
        .ok()
        .map(|prev| unpack(prev).1.saturating_sub(1))
}
