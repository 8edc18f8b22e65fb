//! The status line and the countdown display.
//!
//! `show_status` and `tick` are the only ways to change what is on screen.
//! Both roles write through the same [`Presenter`]; it never decides
//! anything on its own except clearing a success message once it has
//! lingered long enough.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a success-kind message stays up.
pub const SUCCESS_LINGER: Duration = Duration::from_secs(5);

pub const EXPIRED: &str = "Expired";
pub const EXPIRED_MESSAGE: &str = "⏰ QR expired. Generate a new one!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
}

/// What is currently rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub timer: Option<String>,
    pub status: Option<Status>,
}

/// Where renders end up: a terminal, a page, a test recorder.
pub trait Surface: Send + Sync {
    fn render_timer(&self, text: &str);
    /// `None` clears the status line.
    fn render_status(&self, status: Option<&Status>);
}

#[derive(Clone)]
pub struct Presenter {
    surface: Arc<dyn Surface>,
    shown: Arc<Mutex<Shown>>,
}

#[derive(Default)]
struct Shown {
    screen: Screen,
    // bumped on every status change so a stale auto-clear leaves newer messages alone
    generation: u64,
}

impl Presenter {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            shown: Arc::new(Mutex::new(Shown::default())),
        }
    }

    /// Replaces the status line. Success messages clear themselves after
    /// [`SUCCESS_LINGER`]; error messages stay until replaced.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show_status<S: Into<String>>(&self, message: S, kind: StatusKind) {
        let status = Status {
            message: message.into(),
            kind,
        };
        let generation = {
            let mut shown = self.lock();
            shown.generation += 1;
            shown.screen.status = Some(status.clone());
            shown.generation
        };
        self.surface.render_status(Some(&status));

        if kind == StatusKind::Success {
            let presenter = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(SUCCESS_LINGER).await;
                presenter.clear_if_current(generation);
            });
        }
    }

    /// Renders `remaining` as `m:ss`; at zero renders [`EXPIRED`] and raises
    /// the expiry message.
    pub fn tick(&self, remaining: u64) {
        let text = if remaining == 0 {
            EXPIRED.to_string()
        } else {
            clock(remaining)
        };
        self.lock().screen.timer = Some(text.clone());
        self.surface.render_timer(&text);

        if remaining == 0 {
            self.show_status(EXPIRED_MESSAGE, StatusKind::Error);
        }
    }

    pub fn screen(&self) -> Screen {
        self.lock().screen.clone()
    }

    fn clear_if_current(&self, generation: u64) {
        {
            let mut shown = self.lock();
            if shown.generation != generation {
                return;
            }
            shown.screen.status = None;
        }
        self.surface.render_status(None);
    }

    fn lock(&self) -> MutexGuard<'_, Shown> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `125` -> `"2:05"`.
pub fn clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
