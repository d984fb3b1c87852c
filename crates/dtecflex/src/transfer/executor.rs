use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{Config, RemoteConfig};
use crate::db::{record_repo, Database};
use crate::error::TransferError;
use crate::request::RunDate;
use crate::sanitize;
use crate::selector::SelectedRecord;

use super::paths::{resolve_local_files, transfer_paths};
use super::remote::{LocalMirror, RemoteSync, RsyncRemote};

/// Files placed on the remote side for one record.
#[derive(Debug, Clone, Serialize)]
pub struct MovedFiles {
    pub files: Vec<PathBuf>,
    pub remote_dir: String,
    /// False when the copy succeeded but the status update did not.
    pub status_updated: bool,
}

pub struct FileTransferExecutor {
    db: Database,
    remote: Arc<dyn RemoteSync>,
    media_base: String,
    remote_base: String,
}

impl FileTransferExecutor {
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteSync>,
        media_base: impl Into<String>,
        remote_base: impl Into<String>,
    ) -> Self {
        Self {
            db,
            remote,
            media_base: media_base.into(),
            remote_base: remote_base.into(),
        }
    }

    pub fn from_config(config: &Config, db: Database) -> Self {
        Self::new(
            db,
            remote_from_config(&config.remote),
            config.media_base.clone(),
            config.remote_base.clone(),
        )
    }

    /// Copies the record's files and advances it to transferred.
    ///
    /// Any error leaves the record approved. A failed status update after a
    /// successful copy is logged and reported through `status_updated`.
    pub fn transfer(
        &self,
        selected: &SelectedRecord,
        date: &RunDate,
    ) -> Result<MovedFiles, TransferError> {
        let record = &selected.record;
        let category = selected
            .category
            .ok_or(TransferError::UnknownCategory {
                record_id: record.id,
            })?;
        let registration = record
            .registration
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or(TransferError::MissingRegistration {
                record_id: record.id,
            })?;

        let paths = transfer_paths(
            &self.media_base,
            &self.remote_base,
            category,
            date,
            registration,
        );
        let files = resolve_local_files(&paths.local_pattern)?;
        if files.is_empty() {
            return Err(TransferError::NoLocalFiles {
                pattern: paths.local_pattern,
            });
        }

        tracing::debug!(
            record_id = record.id,
            files = files.len(),
            first = %sanitize::redact_path(&files[0]),
            remote = %self.remote.describe(),
            "Copying media files"
        );

        self.remote.ensure_dir(&paths.remote_dir)?;
        self.remote.sync(&files, &paths.remote_dir)?;

        let status_updated = match record_repo::mark_transferred(&self.db, record.id) {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(record_id = record.id, "Record was no longer approved after copy");
                false
            }
            Err(e) => {
                tracing::warn!(record_id = record.id, error = %e, "Failed to mark record transferred");
                false
            }
        };

        Ok(MovedFiles {
            files,
            remote_dir: paths.remote_dir,
            status_updated,
        })
    }
}

pub fn remote_from_config(remote: &RemoteConfig) -> Arc<dyn RemoteSync> {
    match remote {
        RemoteConfig::Rsync(ssh) => Arc::new(RsyncRemote::new(ssh.clone())),
        RemoteConfig::Local => Arc::new(LocalMirror),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::record_repo::NewRecord;
    use crate::lifecycle::{RecordStatus, STATUS_APPROVED};

    struct Fixture {
        _media: tempfile::TempDir,
        _remote: tempfile::TempDir,
        media_base: String,
        remote_base: String,
        db: Database,
    }

    fn fixture() -> Fixture {
        let media = tempfile::tempdir().unwrap();
        let remote = tempfile::tempdir().unwrap();
        Fixture {
            media_base: media.path().to_string_lossy().to_string(),
            remote_base: remote.path().to_string_lossy().to_string(),
            _media: media,
            _remote: remote,
            db: Database::open_in_memory().unwrap(),
        }
    }

    fn selected(db: &Database, reg: Option<&str>, category: &str) -> SelectedRecord {
        let id = record_repo::insert(
            db,
            &NewRecord {
                url: format!("https://news/{}", reg.unwrap_or("none")),
                registration: reg.map(str::to_string),
                category: Some(category.to_string()),
                status: Some(STATUS_APPROVED.to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        SelectedRecord::new(record_repo::find_by_id(db, id).unwrap().unwrap())
    }

    fn date() -> RunDate {
        RunDate::parse("20250904").unwrap()
    }

    #[test]
    fn test_transfer_copies_and_marks_transferred() {
        let fx = fixture();
        let day = PathBuf::from(&fx.media_base).join("CR").join("C20250904");
        std::fs::create_dir_all(&day).unwrap();
        std::fs::write(day.join("C20250904001.html"), "<html/>").unwrap();
        std::fs::write(day.join("C20250904001.jpg"), "img").unwrap();

        let sel = selected(&fx.db, Some("C20250904001"), "Crime");
        let exec = FileTransferExecutor::new(
            fx.db.clone(),
            Arc::new(LocalMirror),
            &fx.media_base,
            &fx.remote_base,
        );
        let moved = exec.transfer(&sel, &date()).unwrap();

        assert_eq!(moved.files.len(), 2);
        assert!(moved.status_updated);
        let remote_day = PathBuf::from(&fx.remote_base).join("CR").join("C20250904");
        assert!(remote_day.join("C20250904001.html").is_file());
        assert!(remote_day.join("C20250904001.jpg").is_file());

        let rec = record_repo::find_by_id(&fx.db, sel.record.id).unwrap().unwrap();
        assert_eq!(rec.status, RecordStatus::Transferred);
    }

    #[test]
    fn test_transfer_without_files_leaves_record_approved() {
        let fx = fixture();
        let sel = selected(&fx.db, Some("C20250904001"), "Crime");
        let exec = FileTransferExecutor::new(
            fx.db.clone(),
            Arc::new(LocalMirror),
            &fx.media_base,
            &fx.remote_base,
        );

        let err = exec.transfer(&sel, &date()).unwrap_err();
        assert!(matches!(err, TransferError::NoLocalFiles { .. }));
        let rec = record_repo::find_by_id(&fx.db, sel.record.id).unwrap().unwrap();
        assert_eq!(rec.status, RecordStatus::Approved);
        assert!(!PathBuf::from(&fx.remote_base).join("CR").exists());
    }

    #[test]
    fn test_transfer_rejects_unknown_category_and_missing_registration() {
        let fx = fixture();
        let exec = FileTransferExecutor::new(
            fx.db.clone(),
            Arc::new(LocalMirror),
            &fx.media_base,
            &fx.remote_base,
        );

        let unknown = selected(&fx.db, Some("X20250904001"), "Outros");
        assert!(matches!(
            exec.transfer(&unknown, &date()),
            Err(TransferError::UnknownCategory { .. })
        ));

        let unregistered = selected(&fx.db, None, "Crime");
        assert!(matches!(
            exec.transfer(&unregistered, &date()),
            Err(TransferError::MissingRegistration { .. })
        ));
    }

    #[test]
    fn test_remote_from_config_local() {
        assert_eq!(remote_from_config(&RemoteConfig::Local).describe(), "local");
    }
}
