//! Heartbeat and watchdog timers for one turn.
//!
//! The heartbeat warns when the stream goes quiet and never cancels anything.
//! The watchdog is the hard bound: when it fires, the engine's recovery
//! callback releases the turn lock and the turn is unwound as if cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use omni_events::{ProgressEvent, ProgressKind, ProgressSink, RunId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::observability::SessionEvent;

/// Called once per watchdog expiry.
pub type RecoveryFn = Arc<dyn Fn() + Send + Sync>;

/// Timer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Maximum quiet period before a heartbeat warning.
    pub heartbeat: Duration,
    /// Maximum lock hold time since start or the last re-arm.
    pub watchdog: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(60),
            watchdog: Duration::from_secs(120),
        }
    }
}

struct Shared {
    run_id: RunId,
    started: Instant,
    fired: AtomicBool,
    sink: Arc<dyn ProgressSink>,
    recovery: RecoveryFn,
}

impl Shared {
    fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        let held = self.started.elapsed();
        (self.recovery)();
        tracing::error!(
            event = SessionEvent::LivenessWatchdogFired.as_str(),
            run_id = self.run_id,
            held_ms = millis(held),
            "watchdog fired; forcing turn lock release"
        );
        self.sink.emit(ProgressEvent::new(
            self.run_id,
            held,
            ProgressKind::WatchdogFired {
                held_ms: millis(held),
            },
        ));
        true
    }
}

/// Owns the two timer tasks of one turn. Dropping it stops both.
pub struct LivenessMonitor {
    shared: Arc<Shared>,
    activity: watch::Sender<u64>,
    rearm: watch::Sender<u64>,
    tasks: Vec<JoinHandle<()>>,
}

impl LivenessMonitor {
    /// Spawn both timers. Must be called inside a tokio runtime.
    pub fn start(
        config: LivenessConfig,
        run_id: RunId,
        sink: Arc<dyn ProgressSink>,
        recovery: RecoveryFn,
    ) -> Self {
        let shared = Arc::new(Shared {
            run_id,
            started: Instant::now(),
            fired: AtomicBool::new(false),
            sink,
            recovery,
        });
        let (activity, activity_rx) = watch::channel(0_u64);
        let (rearm, rearm_rx) = watch::channel(0_u64);
        let tasks = vec![
            tokio::spawn(heartbeat_loop(
                Arc::clone(&shared),
                config.heartbeat,
                activity_rx,
            )),
            tokio::spawn(watchdog_loop(Arc::clone(&shared), config.watchdog, rearm_rx)),
        ];
        Self {
            shared,
            activity,
            rearm,
            tasks,
        }
    }

    /// Record stream activity; restarts the heartbeat window.
    pub fn touch(&self) {
        self.activity.send_modify(|tick| *tick = tick.wrapping_add(1));
    }

    /// Restart the watchdog window and allow it to fire again.
    pub fn rearm(&self) {
        self.shared.fired.store(false, Ordering::SeqCst);
        self.rearm.send_modify(|tick| *tick = tick.wrapping_add(1));
    }

    /// Fire the watchdog now. Returns `false` if it already fired since the
    /// last re-arm.
    pub fn fire(&self) -> bool {
        self.shared.fire()
    }

    pub fn has_fired(&self) -> bool {
        self.shared.fired.load(Ordering::SeqCst)
    }

    /// Abort both timers. Idempotent.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for LivenessMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn heartbeat_loop(shared: Arc<Shared>, bound: Duration, mut activity: watch::Receiver<u64>) {
    let mut quiet_windows: u32 = 0;
    loop {
        match tokio::time::timeout(bound, activity.changed()).await {
            Ok(Ok(())) => quiet_windows = 0,
            Ok(Err(_)) => break,
            Err(_) => {
                quiet_windows = quiet_windows.saturating_add(1);
                let idle = bound.saturating_mul(quiet_windows);
                tracing::warn!(
                    event = SessionEvent::LivenessHeartbeat.as_str(),
                    run_id = shared.run_id,
                    idle_ms = millis(idle),
                    "no stream activity; model may be stuck reasoning"
                );
                shared.sink.emit(ProgressEvent::new(
                    shared.run_id,
                    shared.started.elapsed(),
                    ProgressKind::HeartbeatWarning {
                        idle_ms: millis(idle),
                    },
                ));
            }
        }
    }
}

async fn watchdog_loop(shared: Arc<Shared>, bound: Duration, mut rearm: watch::Receiver<u64>) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(bound) => {
                shared.fire();
                if rearm.changed().await.is_err() {
                    break;
                }
            }
            changed = rearm.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "../tests/unit/liveness.rs"]
mod tests;
