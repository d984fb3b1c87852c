//! Local and remote path conventions for a record's media files.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::category::Category;
use crate::error::TransferError;
use crate::request::RunDate;

/// Where a record's files are looked up and where they are copied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPaths {
    /// Glob over `{media}/{abbr}/{prefix}{date}/{registration}*`.
    pub local_pattern: String,
    /// `{remote}/{abbr}/{prefix}{date}`.
    pub remote_dir: String,
}

/// Directory name shared by both sides: `{prefix}{date}`.
pub fn day_directory(category: Category, date: &RunDate) -> String {
    format!("{}{}", category.path_prefix(), date)
}

pub fn transfer_paths(
    media_base: &str,
    remote_base: &str,
    category: Category,
    date: &RunDate,
    registration: &str,
) -> TransferPaths {
    let day = day_directory(category, date);
    let local_dir = Path::new(media_base)
        .join(category.abbreviation())
        .join(&day);

    // Only the registration's trailing wildcard is a glob; every fixed
    // component is matched literally.
    let local_pattern = format!(
        "{}/{}*",
        Pattern::escape(&local_dir.to_string_lossy()),
        Pattern::escape(registration)
    );

    let remote_dir = format!(
        "{}/{}/{}",
        remote_base.trim_end_matches('/'),
        category.abbreviation(),
        day
    );

    TransferPaths {
        local_pattern,
        remote_dir,
    }
}

/// Regular files matching `pattern`, sorted. Unreadable entries are logged
/// and skipped.
pub fn resolve_local_files(pattern: &str) -> Result<Vec<PathBuf>, TransferError> {
    let entries = glob::glob(pattern).map_err(|e| TransferError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable media entry");
            }
        }
    }
    files.sort();
    Ok(files)
}
