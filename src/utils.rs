//! Shared HTTP plumbing used across the application

use std::error::Error as StdError;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{ModError, Result};
use crate::logging::log_warning;
use crate::remote::Transfer;

pub const USER_AGENT: &str = concat!("ModHaven/", env!("CARGO_PKG_VERSION"));

/// Build an agent whose connect, read and write phases all share `timeout`
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(USER_AGENT)
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .build()
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

/// Map a ureq failure onto [`ModError`], separating timeouts from other failures
pub(crate) fn request_error(target: &str, err: ureq::Error) -> ModError {
    match err {
        ureq::Error::Status(code, response) => {
            ModError::remote(target, format!("HTTP {} {}", code, response.status_text()))
        }
        ureq::Error::Transport(transport) => {
            let mut source = transport.source();
            while let Some(e) = source {
                if let Some(io_err) = e.downcast_ref::<io::Error>() {
                    if is_timeout(io_err) {
                        return ModError::TimedOut {
                            target: target.to_string(),
                        };
                    }
                }
                source = e.source();
            }
            ModError::remote(target, transport)
        }
    }
}

/// Map an error raised while reading a response body
pub(crate) fn body_error(target: &str, err: io::Error) -> ModError {
    if is_timeout(&err) {
        ModError::TimedOut {
            target: target.to_string(),
        }
    } else {
        ModError::remote(target, err)
    }
}

/// [`Transfer`] over plain HTTPS
pub struct HttpTransfer {
    agent: ureq::Agent,
}

impl HttpTransfer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: build_agent(timeout),
        }
    }
}

impl Transfer for HttpTransfer {
    fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| request_error(url, e))?;
        response.into_string().map_err(|e| body_error(url, e))
    }

    fn download(&self, url: &str, dest: &Path, progress: &dyn Fn(f32)) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ModError::persistence(parent, e))?;
        }

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| request_error(url, e))?;

        let total_size = response
            .header("Content-Length")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        save_body(response.into_reader(), dest, url, total_size, progress)
    }
}

/// Stream `reader` into `dest`. A failed transfer never leaves a partial file behind.
fn save_body(
    reader: impl Read,
    dest: &Path,
    url: &str,
    total_size: u64,
    progress: &dyn Fn(f32),
) -> Result<()> {
    let result = write_body(reader, dest, url, total_size, progress);
    if result.is_err() {
        discard_partial(dest);
    }
    result
}

fn write_body(
    mut reader: impl Read,
    dest: &Path,
    url: &str,
    total_size: u64,
    progress: &dyn Fn(f32),
) -> Result<()> {
    let mut file = fs::File::create(dest).map_err(|e| ModError::persistence(dest, e))?;
    let mut buffer = [0; 65536];
    let mut downloaded: u64 = 0;

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| body_error(url, e))?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])
            .map_err(|e| ModError::persistence(dest, e))?;
        downloaded += bytes_read as u64;

        if total_size > 0 {
            progress((downloaded as f32 / total_size as f32).min(1.0));
        }
    }

    file.flush().map_err(|e| ModError::persistence(dest, e))
}

/// Remove a partially written download, if any
fn discard_partial(dest: &Path) {
    match fs::remove_file(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log_warning(&format!("Could not remove {}: {}", dest.display(), e)),
    }
}
