//! The student side: read the token from the page address, submit once per click.

use std::sync::Arc;

use reqwest::{StatusCode, Url};
use tokio::sync::watch;

use crate::err::{Error, Maybe};
use crate::models::{AttendanceMarked, MarkAttendance};
use crate::presenter::StatusKind;
use crate::session::Session;

pub const MARK_PATH: &str = "/mark_attendance";

pub const SUBMIT_LABEL: &str = "✓ Mark My Attendance";
pub const SUBMITTING_LABEL: &str = "⏳ Marking...";

const NO_TOKEN_ON_LOAD: &str = "⚠️ No token found. Scan the QR code again.";
const TOKEN_MISSING: &str = "Token missing! Please scan the QR code again.";
const CONNECT_FAILED: &str = "❌ Failed to connect. Please check your internet!";
const NOT_RECORDED: &str = "Attendance was not recorded";

/// The two input fields of the attendance form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pub student_name: String,
    pub roll: String,
}

impl Form {
    pub fn new<N: Into<String>, R: Into<String>>(student_name: N, roll: R) -> Self {
        Self {
            student_name: student_name.into(),
            roll: roll.into(),
        }
    }

    pub fn clear(&mut self) {
        self.student_name.clear();
        self.roll.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentState {
    Idle,
    Submitting,
    Success,
    Error,
}

impl StudentState {
    /// The submit control is disabled while a request is in flight.
    pub fn submit_enabled(self) -> bool {
        self != StudentState::Submitting
    }

    pub fn submit_label(self) -> &'static str {
        if self.submit_enabled() {
            SUBMIT_LABEL
        } else {
            SUBMITTING_LABEL
        }
    }
}

pub struct AttendanceSubmitter {
    session: Arc<Session>,
    token: Option<String>,
    pub form: Form,
    state: watch::Sender<StudentState>,
    // kept so the channel never closes and `send` always lands
    current: watch::Receiver<StudentState>,
}

impl AttendanceSubmitter {
    /// Loads the student page at `address`. Without a `token` in it the
    /// page warns right away; submitting is still allowed but will fail.
    pub fn from_page(session: Arc<Session>, address: &str) -> Self {
        let token = token_from_address(address);
        match &token {
            Some(token) => log::info!("Token: {}", token),
            None => {
                log::warn!("No token in URL {}", address);
                session
                    .presenter()
                    .show_status(NO_TOKEN_ON_LOAD, StatusKind::Error);
            }
        }
        Self::with_token(session, token)
    }

    pub fn with_token(session: Arc<Session>, token: Option<String>) -> Self {
        let (state, current) = watch::channel(StudentState::Idle);
        Self {
            session,
            token,
            form: Form::default(),
            state,
            current,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn state(&self) -> StudentState {
        *self.current.borrow()
    }

    /// Follows the submit control while `submit` holds the form.
    pub fn subscribe(&self) -> watch::Receiver<StudentState> {
        self.current.clone()
    }

    pub fn submit_enabled(&self) -> bool {
        self.state().submit_enabled()
    }

    pub fn submit_label(&self) -> &'static str {
        self.state().submit_label()
    }

    fn enter(&self, state: StudentState) {
        let _ = self.state.send(state);
    }

    /// Sends the form once. On success the fields are cleared; on any
    /// failure they are kept so the student can simply try again.
    pub async fn submit(&mut self) -> Maybe<String> {
        let presenter = self.session.presenter().clone();

        let token = match self.token.clone() {
            Some(token) => token,
            None => {
                log::error!("No token in URL");
                presenter.show_status(format!("❌ {}", TOKEN_MISSING), StatusKind::Error);
                self.enter(StudentState::Error);
                return Err(Error::missing_token(TOKEN_MISSING));
            }
        };

        self.enter(StudentState::Submitting);
        log::info!(
            "Submitting: name={:?} roll={:?} token={}",
            self.form.student_name,
            self.form.roll,
            token
        );
        let outcome = self.send(&token).await;

        match outcome {
            Ok((_, reply)) if reply.is_success() => {
                let message = reply.message.unwrap_or_default();
                presenter.show_status(format!("✅ {}", message), StatusKind::Success);
                self.form.clear();
                self.enter(StudentState::Success);
                Ok(message)
            }
            Ok((code, reply)) => {
                let message = reply.message.unwrap_or_else(|| NOT_RECORDED.to_string());
                log::warn!("Attendance rejected ({}): {}", reply.status, message);
                presenter.show_status(format!("❌ {}", message), StatusKind::Error);
                self.enter(StudentState::Error);
                Err(Error::Remote {
                    status: (!code.is_success()).then(|| code.as_u16()),
                    message,
                })
            }
            Err(err) => {
                log::error!("Submission failed: {}", err);
                presenter.show_status(CONNECT_FAILED, StatusKind::Error);
                self.enter(StudentState::Error);
                Err(err)
            }
        }
    }

    async fn send(&self, token: &str) -> Maybe<(StatusCode, AttendanceMarked)> {
        let body = MarkAttendance {
            student_name: &self.form.student_name,
            roll: &self.form.roll,
            token,
        };
        let response = self.session.backend().post_json(MARK_PATH, &body).await?;
        let status = response.status();
        let reply: AttendanceMarked = response.json().await?;
        log::debug!("Result: {:?}", reply);
        Ok((status, reply))
    }
}

fn parse_address(address: &str) -> Option<Url> {
    Url::parse(address)
        .or_else(|_| Url::parse("http://page.invalid/").and_then(|base| base.join(address)))
        .ok()
}

/// The non-empty `token` query value of a page address, if any. Accepts full
/// URLs as well as bare `?token=...` strings.
pub fn token_from_address(address: &str) -> Option<String> {
    let url = parse_address(address)?;
    let token = url
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// `scheme://host[:port]` of a full page address.
pub fn page_origin(address: &str) -> Option<String> {
    let url = Url::parse(address).ok()?;
    let origin = url.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        None
    }
}
