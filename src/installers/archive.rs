//! Zip extraction
//!
//! Existing files are overwritten silently: the most recent install wins.

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::Path;

fn zip_error(e: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Extract every entry of the archive at `archive_path` into `destination`.
///
/// Returns the number of files written. Entries whose names would escape
/// `destination` are skipped.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> io::Result<usize> {
    let file = File::open(archive_path)?;
    extract_from(file, destination)
}

pub fn extract_from<R: Read + Seek>(reader: R, destination: &Path) -> io::Result<usize> {
    let mut archive = zip::ZipArchive::new(reader).map_err(zip_error)?;
    fs::create_dir_all(destination)?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;

        let Some(relative) = entry.enclosed_name() else {
            crate::logging::log_warning(&format!(
                "Skipping unsafe archive entry '{}'",
                entry.name()
            ));
            continue;
        };
        let output_path = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&output_path)?;
        io::copy(&mut entry, &mut outfile)?;
        written += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&output_path, fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok(written)
}
