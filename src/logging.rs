//! Session log
//!
//! One file per run under `<data dir>/logs`, opened lazily on first use and
//! headed by the app version and the configured game roots. Lines are echoed
//! to stdout unless the CLI runs with `--quiet`.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use chrono::Local;
use parking_lot::Mutex;

use crate::config::AppConfig;
use crate::games::Game;
use crate::haven_path;

static LOGGER: OnceLock<Mutex<SessionLog>> = OnceLock::new();
static CONSOLE_ECHO: AtomicBool = AtomicBool::new(true);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    /// A user command (install, enable, ...)
    Action,
    Download,
    Install,
    Warning,
    Error,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Action => "[ACTION]",
            LogLevel::Download => "[DOWNLOAD]",
            LogLevel::Install => "[INSTALL]",
            LogLevel::Warning => "[WARNING]",
            LogLevel::Error => "[ERROR]",
        }
    }
}

/// `[HH:MM:SS] [LEVEL] message`
fn format_line(time: &str, level: LogLevel, message: &str) -> String {
    format!("[{}] {} {}", time, level.prefix(), message)
}

fn session_header(config: &AppConfig) -> String {
    let mut header = format!(
        "ModHaven v{} on {}/{}, session started {}\n",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    for game in Game::ALL {
        let root = config
            .game_root(game)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string());
        header.push_str(&format!("  {:<14} {}\n", game.display_name(), root));
    }
    header
}

struct SessionLog {
    file: Option<File>,
}

impl SessionLog {
    fn open(log_dir: &Path) -> Self {
        let _ = fs::create_dir_all(log_dir);
        let name = format!("modhaven_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        let mut log = Self {
            file: File::create(log_dir.join(name)).ok(),
        };
        log.write_line(&session_header(&AppConfig::load()));
        log
    }

    fn write_line(&mut self, line: &str) {
        if let Some(file) = self.file.as_mut() {
            let _ = writeln!(file, "{}", line);
            let _ = file.flush();
        }
        if CONSOLE_ECHO.load(Ordering::Relaxed) {
            println!("{}", line);
        }
    }
}

/// Open the session log now instead of on the first message
pub fn init_logger() {
    LOGGER.get_or_init(|| Mutex::new(SessionLog::open(&haven_path!("logs"))));
}

/// Toggle echoing log lines to stdout
pub fn set_console_echo(enabled: bool) {
    CONSOLE_ECHO.store(enabled, Ordering::Relaxed);
}

pub fn log(level: LogLevel, message: &str) {
    let line = format_line(&Local::now().format("%H:%M:%S").to_string(), level, message);
    LOGGER
        .get_or_init(|| Mutex::new(SessionLog::open(&haven_path!("logs"))))
        .lock()
        .write_line(&line);
}

pub fn log_info(message: &str) {
    log(LogLevel::Info, message);
}

pub fn log_action(message: &str) {
    log(LogLevel::Action, message);
}

pub fn log_download(message: &str) {
    log(LogLevel::Download, message);
}

pub fn log_install(message: &str) {
    log(LogLevel::Install, message);
}

pub fn log_warning(message: &str) {
    log(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log(LogLevel::Error, message);
}
