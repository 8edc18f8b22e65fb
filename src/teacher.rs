//! The teacher side: ask for a token, fetch its QR image, count down.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::countdown::{Countdown, Phase};
use crate::err::{Error, Maybe};
use crate::models::{GenerateToken, TokenGranted};
use crate::presenter::StatusKind;
use crate::session::Session;

pub const GENERATE_PATH: &str = "/generate_token";
pub const QR_PATH: &str = "/get_qr";

/// Mirrors the backend's validity window. The backend never sends it, so
/// this can drift from what the server actually enforces.
pub const TOKEN_LIFETIME_SECS: u64 = 120;

/// One successful generation.
#[derive(Debug, Clone)]
pub struct TokenHandle {
    pub subject: String,
    /// Echoed by some backends; informational only.
    pub token: Option<String>,
    pub generation: u64,
    pub issued_at: DateTime<Utc>,
}

impl TokenHandle {
    pub fn stale_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(TOKEN_LIFETIME_SECS as i64)
    }

    pub fn is_stale(&self) -> bool {
        Utc::now().gt(&self.stale_at())
    }
}

/// The QR image as the page sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visual {
    Pending,
    Loaded(Vec<u8>),
    Failed(String),
}

impl Visual {
    pub fn load(body: Vec<u8>) -> Visual {
        if body.is_empty() {
            Visual::Failed("image body was empty".to_string())
        } else {
            Visual::Loaded(body)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeacherState {
    Idle,
    Requesting,
    ActiveCountdown,
    Expired,
    Error,
}

enum Stage {
    Idle,
    Requesting,
    Counting(Countdown),
    Failed,
}

#[derive(Debug)]
pub struct Generated {
    pub handle: TokenHandle,
    pub image: Vec<u8>,
    pub countdown: Countdown,
}

pub struct TokenSession {
    session: Arc<Session>,
    stage: Stage,
    generations: u64,
    visual: Visual,
}

impl TokenSession {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            stage: Stage::Idle,
            generations: 0,
            visual: Visual::Pending,
        }
    }

    pub fn state(&self) -> TeacherState {
        match &self.stage {
            Stage::Idle => TeacherState::Idle,
            Stage::Requesting => TeacherState::Requesting,
            Stage::Failed => TeacherState::Error,
            Stage::Counting(countdown) => match countdown.phase() {
                Phase::Expired => TeacherState::Expired,
                _ => TeacherState::ActiveCountdown,
            },
        }
    }

    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    /// Asks the backend for a fresh token for `subject`.
    ///
    /// A blank subject fails with `Error::Validation` before anything is sent
    /// and leaves the state untouched.
    pub async fn request_token(&mut self, subject: &str) -> Maybe<TokenHandle> {
        self.request_token_then(subject, || {}).await
    }

    /// `on_send` runs once the subject has passed validation, right before
    /// the request goes out.
    async fn request_token_then<F: FnOnce()>(
        &mut self,
        subject: &str,
        on_send: F,
    ) -> Maybe<TokenHandle> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(Error::validation("subject", "Please enter a subject name!"));
        }
        on_send();

        self.generations += 1;
        self.stage = Stage::Requesting;
        log::info!("Requesting token #{} for {}", self.generations, subject);

        let granted = self.create_token(subject).await;
        let granted = match granted {
            Ok(granted) => granted,
            Err(err) => {
                self.settle_failure();
                return Err(err);
            }
        };

        Ok(TokenHandle {
            subject: subject.to_string(),
            token: granted.token,
            generation: self.generations,
            issued_at: Utc::now(),
        })
    }

    async fn create_token(&self, subject: &str) -> Maybe<TokenGranted> {
        let response = self
            .session
            .backend()
            .post_json(GENERATE_PATH, &GenerateToken { subject })
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!("Error response: {}", text);
            return Err(Error::status(status, "Server error"));
        }

        let granted: TokenGranted = response.json().await?;
        log::debug!("Token data: {:?}", granted);
        if !granted.is_success() {
            return Err(Error::remote("Token generation failed"));
        }
        Ok(granted)
    }

    /// Downloads the QR image for the current token, bypassing any cache.
    pub async fn fetch_visual(&mut self, handle: &TokenHandle) -> Maybe<Vec<u8>> {
        let body = self.download(handle).await;
        if body.is_err() {
            self.settle_failure();
        }
        body
    }

    async fn download(&self, handle: &TokenHandle) -> Maybe<Vec<u8>> {
        let buster = self.session.cache_buster();
        let response = self.session.backend().get_fresh(QR_PATH, buster).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(status, "QR fetch failed"));
        }

        let body = response.bytes().await?.to_vec();
        log::debug!(
            "QR blob for token #{} ({}): {} bytes",
            handle.generation,
            handle.subject,
            body.len()
        );
        Ok(body)
    }

    /// Replaces any running countdown with a new one of `seconds`.
    pub fn start_countdown(&mut self, seconds: u64) -> Countdown {
        let countdown = self.session.start_countdown(seconds);
        self.stage = Stage::Counting(countdown.clone());
        countdown
    }

    /// The "Generate QR" button: token, then image, then countdown, with
    /// every outcome ending up on the status line.
    pub async fn generate(&mut self, subject: &str) -> Maybe<Generated> {
        let presenter = self.session.presenter().clone();

        let handle = match self
            .request_token_then(subject, || {
                presenter.show_status("⏳ Generating QR Code...", StatusKind::Success)
            })
            .await
        {
            Ok(handle) => handle,
            Err(err @ Error::Validation { .. }) => {
                presenter.show_status(format!("⚠️ {}", err), StatusKind::Error);
                return Err(err);
            }
            Err(err) => return Err(self.fail(err)),
        };
        self.visual = Visual::Pending;

        let body = match self.fetch_visual(&handle).await {
            Ok(body) => body,
            Err(err) => return Err(self.fail(err)),
        };

        self.visual = Visual::load(body);
        match self.visual.clone() {
            Visual::Loaded(image) => {
                log::info!("QR loaded for {}", handle.subject);
                presenter.show_status(
                    format!("✅ QR Code generated for {}!", handle.subject),
                    StatusKind::Success,
                );
                let countdown = self.start_countdown(TOKEN_LIFETIME_SECS);
                Ok(Generated {
                    handle,
                    image,
                    countdown,
                })
            }
            Visual::Failed(reason) => Err(self.image_failed(reason)),
            Visual::Pending => Err(self.image_failed("image never arrived".to_string())),
        }
    }

    fn image_failed(&mut self, reason: String) -> Error {
        log::error!("QR image load failed: {}", reason);
        self.session
            .presenter()
            .show_status("❌ QR image failed to load!", StatusKind::Error);
        self.settle_failure();
        Error::Transport {
            kind: "ImageError",
            message: reason,
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        log::error!("Generation failed: {}", err);
        self.session
            .presenter()
            .show_status(format!("❌ Error: {}", err), StatusKind::Error);
        self.settle_failure();
        err
    }

    /// A failed request leaves a live countdown in charge; with none the
    /// page shows the error state.
    fn settle_failure(&mut self) {
        self.stage = match self.session.countdown() {
            Some(countdown) if !countdown.token().is_cancelled() => Stage::Counting(countdown),
            _ => Stage::Failed,
        };
    }
}

/// Link to the spreadsheet the backend appends attendance rows to.
pub fn sheet_url(sheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}/edit", sheet_id)
}
