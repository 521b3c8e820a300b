// src/edinet/archive.rs
//
// Blocking archive helpers. Callers on the async runtime wrap these in
// `tokio::task::spawn_blocking` so zip inflation and directory walks never
// stall the scheduler.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::utils::error::ExtractError;

/// Marker identifying the annual securities-report instance document inside
/// an EDINET archive (corporate-report taxonomy prefix).
const REPORT_FILENAME_MARKER: &str = "jpcrp";

/// Unpacks a downloaded submission archive under `dest_dir` and returns the
/// paths of the files written. Entry paths are sanitized against traversal.
pub fn extract_archive(bytes: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    fs::create_dir_all(dest_dir)?;

    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(rel_path) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(ExtractError::BadEntryName(entry.name().to_string()));
        };
        let out_path = dest_dir.join(rel_path);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        fs::write(&out_path, &buf)?;
        written.push(out_path);
    }

    tracing::debug!("Extracted {} files into {}", written.len(), dest_dir.display());
    Ok(written)
}

/// Recursively finds `.xbrl` instance documents under `dir`.
pub fn find_xbrl_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect_xbrl(dir, &mut found);
    found.sort();
    found
}

fn collect_xbrl(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_xbrl(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "xbrl") {
            out.push(path);
        }
    }
}

/// Keeps the instance documents that look like the securities report itself.
/// Falls back to the full list when the marker never appears, so a filing
/// with an unexpected layout still gets scanned.
pub fn filter_report_files(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let report_files: Vec<PathBuf> = files
        .iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_lowercase().contains(REPORT_FILENAME_MARKER))
        })
        .cloned()
        .collect();

    if report_files.is_empty() && !files.is_empty() {
        tracing::warn!("No securities-report instance document found; scanning all XBRL files");
        return files;
    }
    report_files
}
