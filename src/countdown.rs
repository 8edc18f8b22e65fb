use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::presenter::Presenter;

pub const TICK: Duration = Duration::from_secs(1);

/// Cooperative stop flag; the countdown checks it before every tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running(u64),
    Expired,
    Cancelled,
}

/// A running (or finished) countdown.
#[derive(Debug, Clone)]
pub struct Countdown {
    token: CancelToken,
    phase: watch::Receiver<Phase>,
}

impl Countdown {
    /// Spawns the ticking task. The first tick renders `seconds` right away,
    /// then one per second down to zero: `seconds + 1` ticks in total.
    pub fn start(presenter: Presenter, seconds: u64) -> Countdown {
        let token = CancelToken::default();
        let (tx, rx) = watch::channel(Phase::Running(seconds));

        let cancel = token.clone();
        tokio::spawn(async move {
            let mut ticks = interval(TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut remaining = seconds;
            loop {
                ticks.tick().await;
                if cancel.is_cancelled() {
                    log::debug!("countdown cancelled at {}s", remaining);
                    let _ = tx.send(Phase::Cancelled);
                    return;
                }
                presenter.tick(remaining);
                if remaining == 0 {
                    log::info!("countdown expired");
                    let _ = tx.send(Phase::Expired);
                    return;
                }
                let _ = tx.send(Phase::Running(remaining));
                remaining -= 1;
            }
        });

        Countdown { token, phase: rx }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Resolves once the countdown has reached zero or been cancelled.
    pub async fn finished(&self) -> Phase {
        let mut phase = self.phase.clone();
        loop {
            let current = *phase.borrow();
            if !matches!(current, Phase::Running(_)) {
                return current;
            }
            if phase.changed().await.is_err() {
                // task gone without a final word; treat as stopped
                return *phase.borrow();
            }
        }
    }
}
