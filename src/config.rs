use std::env;

pub const ORIGIN_VAR: &str = "ATTENDANCE_ORIGIN";
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:5050";

/// Where the pages are served from. The backend address itself is
/// discovered from here at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub origin: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            origin: try_load(ORIGIN_VAR, DEFAULT_ORIGIN),
        }
    }

    /// A flag given on the command line wins over the environment.
    pub fn with_origin(self, origin: Option<String>) -> Self {
        match origin {
            Some(origin) => Self { origin },
            None => self,
        }
    }
}

fn try_load(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        Ok(_) => {
            log::warn!("{key} is blank, using default: {default}");
            default.to_string()
        }
        Err(_) => {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}
