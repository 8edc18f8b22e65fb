pub mod config;
pub mod countdown;
pub mod err;
pub mod http;
pub mod io;
pub mod locator;
pub mod models;
pub mod presenter;
pub mod session;
pub mod student;
pub mod teacher;
pub mod terminal;

#[cfg(test)]
mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::presenter::Presenter;
use crate::session::Session;
use crate::student::{AttendanceSubmitter, Form};
use crate::teacher::{TeacherState, TokenSession};
use crate::terminal::Terminal;

#[derive(Parser)]
#[command(name = "attendance", about = "QR attendance: show a code as teacher, check in as student")]
struct Cli {
    /// Origin the pages are served from; the backend is discovered from it
    #[arg(short, long)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a QR code for a subject and count down until it expires
    Teacher {
        #[arg(short, long)]
        subject: String,

        /// Where to save the QR image
        #[arg(long, default_value = "qr.png")]
        out: PathBuf,
    },
    /// Mark attendance using the address the QR code led to
    Student {
        /// Full student page address, including `?token=...`
        #[arg(short, long)]
        page: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        roll: String,
    },
    /// Check that the backend answers
    Ping,
    /// Print the attendance spreadsheet link
    Sheet {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::load().with_origin(cli.origin.clone());

    match cli.command {
        Commands::Teacher { subject, out } => run_teacher(&config.origin, &subject, &out).await,
        Commands::Student { page, name, roll } => {
            let origin = cli
                .origin
                .or_else(|| student::page_origin(&page))
                .unwrap_or(config.origin);
            run_student(&origin, &page, Form::new(name, roll)).await
        }
        Commands::Ping => {
            let address = locator::resolve(&config.origin).await;
            match locator::ping(&http::Backend::new(address.as_str())?).await {
                Some(body) => {
                    println!("{} is up: {}", address, body);
                    Ok(())
                }
                None => bail!("Backend at {} is not answering", address),
            }
        }
        Commands::Sheet { id } => {
            println!("{}", teacher::sheet_url(&id));
            Ok(())
        }
    }
}

async fn open(origin: &str) -> anyhow::Result<Arc<Session>> {
    log::info!("Initializing against page origin {}", origin);
    let session = Session::open(origin, Presenter::new(Arc::new(Terminal))).await?;
    log::info!("Using backend {}", session.address());
    locator::ping(session.backend()).await;
    Ok(session)
}

async fn run_teacher(origin: &str, subject: &str, out: &Path) -> anyhow::Result<()> {
    let session = open(origin).await?;
    let mut controller = TokenSession::new(session);

    let generated = controller.generate(subject).await?;
    io::save_visual(out, &generated.image).await?;
    println!("QR image for {} saved to {}", generated.handle.subject, out.display());

    tokio::select! {
        phase = generated.countdown.finished() => {
            log::info!("Countdown finished: {:?}", phase);
        }
        _ = tokio::signal::ctrl_c() => {
            generated.countdown.cancel();
            eprintln!("\nShutting down.");
        }
    }

    if controller.state() == TeacherState::Expired {
        log::info!(
            "Token #{} stale since {}",
            generated.handle.generation,
            generated.handle.stale_at()
        );
    }
    Ok(())
}

async fn run_student(origin: &str, page: &str, form: Form) -> anyhow::Result<()> {
    let session = open(origin).await?;
    let mut submitter = AttendanceSubmitter::from_page(session, page);
    submitter.form = form;

    let mut states = submitter.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow();
            log::debug!("{} (enabled: {})", state.submit_label(), state.submit_enabled());
        }
    });
    submitter.submit().await?;
    Ok(())
}
