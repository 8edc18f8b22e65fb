use std::io::Write;

use crate::presenter::{Status, StatusKind, Surface};

/// Renders to stdout: the timer rewrites its own line, status messages get
/// a line each.
#[derive(Debug, Default)]
pub struct Terminal;

impl Surface for Terminal {
    fn render_timer(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r⏱  {:<8}", text);
        let _ = out.flush();
    }

    fn render_status(&self, status: Option<&Status>) {
        match status {
            Some(Status {
                message,
                kind: StatusKind::Error,
            }) => eprintln!("\n{}", message),
            Some(Status { message, .. }) => println!("\n{}", message),
            None => log::trace!("status cleared"),
        }
    }
}
