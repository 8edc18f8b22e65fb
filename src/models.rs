use serde::{Deserialize, Serialize};

pub const SUCCESS: &str = "success";

/// `GET /config`
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub backend_url: Option<String>,
}

/// `POST /generate_token`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateToken<'a> {
    pub subject: &'a str,
}

/// Only `status` is part of the contract; the backend usually echoes the
/// rest as well.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGranted {
    pub status: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenGranted {
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }
}

/// `POST /mark_attendance`
#[derive(Debug, Clone, Serialize)]
pub struct MarkAttendance<'a> {
    pub student_name: &'a str,
    pub roll: &'a str,
    pub token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceMarked {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl AttendanceMarked {
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }
}
