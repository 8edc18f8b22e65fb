use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use crate::countdown::Countdown;
use crate::err::Maybe;
use crate::http::Backend;
use crate::locator::{self, BackendAddress};
use crate::presenter::Presenter;

/// State shared by everything on one page.
///
/// The backend address is fixed at construction. The countdown slot is only
/// written by [`Session::start_countdown`], which always cancels the previous
/// countdown first, so at most one is ever live.
pub struct Session {
    address: BackendAddress,
    backend: Backend,
    presenter: Presenter,
    countdown: Mutex<Option<Countdown>>,
    last_buster: AtomicI64,
}

impl Session {
    /// Resolves the backend from `origin` and opens a session against it.
    pub async fn open(origin: &str, presenter: Presenter) -> Maybe<Arc<Session>> {
        let address = locator::resolve(origin).await;
        Session::new(address, presenter)
    }

    pub fn new(address: BackendAddress, presenter: Presenter) -> Maybe<Arc<Session>> {
        let backend = Backend::new(address.as_str())?;
        Ok(Arc::new(Session {
            address,
            backend,
            presenter,
            countdown: Mutex::new(None),
            last_buster: AtomicI64::new(0),
        }))
    }

    pub fn address(&self) -> &BackendAddress {
        &self.address
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    /// Cancels whatever countdown is running and starts a fresh one.
    pub fn start_countdown(&self, seconds: u64) -> Countdown {
        let mut slot = self.countdown.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        let countdown = Countdown::start(self.presenter.clone(), seconds);
        *slot = Some(countdown.clone());
        countdown
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Millisecond clock, bumped so that no two calls ever return the same value.
    pub fn cache_buster(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_buster
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::Phase;
    use crate::presenter::{EXPIRED, EXPIRED_MESSAGE};
    use crate::testing::Recording;
    use std::time::Duration;
    use tokio::time::sleep;

    fn session() -> (Arc<Session>, Arc<Recording>) {
        let recording = Arc::new(Recording::default());
        let session = Session::new(
            BackendAddress::new("http://127.0.0.1:5050"),
            Presenter::new(recording.clone()),
        )
        .unwrap();
        (session, recording)
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_cancels_the_previous_countdown() {
        let (session, recording) = session();
        let first = session.start_countdown(120);

        sleep(Duration::from_millis(10_500)).await;
        let second = session.start_countdown(120);
        assert_eq!(second.finished().await, Phase::Expired);
        assert_eq!(first.phase(), Phase::Cancelled);

        let timers = recording.timers();
        // 11 renders from the first run (2:00 down to 1:50), then a full second run
        assert_eq!(timers.len(), 11 + 121);
        assert_eq!(timers[10], "1:50");
        assert_eq!(timers[11], "2:00");
        assert_eq!(timers.last().map(String::as_str), Some(EXPIRED));
        assert_eq!(recording.messages(), vec![EXPIRED_MESSAGE]);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_holds_the_latest_countdown() {
        let (session, _) = session();
        assert!(session.countdown().is_none());

        let first = session.start_countdown(5);
        let second = session.start_countdown(5);
        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());
        assert!(!session.countdown().unwrap().token().is_cancelled());
    }

    #[test]
    fn cache_busters_strictly_increase() {
        let (session, _) = session();
        let mut last = session.cache_buster();
        for _ in 0..1000 {
            let next = session.cache_buster();
            assert!(next > last);
            last = next;
        }
    }
}
