//! Transports that place media files under the remote base.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::config::{expand_home, SshConfig};
use crate::error::TransferError;
use crate::sanitize;

/// Copies files into a remote directory.
///
/// Both operations are idempotent: creating an existing directory succeeds
/// and files whose size already matches are left alone. Permissions,
/// ownership and timestamps are never carried over.
pub trait RemoteSync: Send + Sync {
    fn ensure_dir(&self, remote_dir: &str) -> Result<(), TransferError>;

    fn sync(&self, files: &[PathBuf], remote_dir: &str) -> Result<(), TransferError>;

    /// Destination label safe for logs.
    fn describe(&self) -> String;
}

/// Escapes a token for use inside single quotes on the remote shell.
fn shell_escape(token: &str) -> String {
    token.replace('\'', "'\\''")
}

/// stderr and stdout of a failed child, or its exit code when both are empty.
fn format_command_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// rsync over ssh with key authentication.
pub struct RsyncRemote {
    ssh: SshConfig,
    key_path: PathBuf,
}

impl RsyncRemote {
    pub fn new(ssh: SshConfig) -> Self {
        let key_path = expand_home(&ssh.key_path);
        Self { ssh, key_path }
    }

    fn destination_host(&self) -> String {
        format!("{}@{}", self.ssh.user, self.ssh.host)
    }

    fn ssh_command(&self) -> String {
        format!(
            "ssh -i '{}' -p {}",
            shell_escape(&self.key_path.to_string_lossy()),
            self.ssh.port
        )
    }

    pub fn mkdir_args(&self, remote_dir: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.key_path.to_string_lossy().to_string(),
            "-p".to_string(),
            self.ssh.port.to_string(),
            self.destination_host(),
            format!("mkdir -p '{}'", shell_escape(remote_dir)),
        ]
    }

    pub fn rsync_args(&self, files: &[PathBuf], remote_dir: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "-az",
            "--no-perms",
            "--no-owner",
            "--no-group",
            "--no-times",
            "--omit-dir-times",
            "--size-only",
            "-e",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(self.ssh_command());
        args.extend(files.iter().map(|f| f.to_string_lossy().to_string()));
        args.push(format!(
            "{}:{}/",
            self.destination_host(),
            remote_dir.trim_end_matches('/')
        ));
        args
    }

    fn run(&self, program: &str, args: &[String]) -> Result<Output, TransferError> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TransferError::Spawn {
                program: program.to_string(),
                source: e,
            })
    }
}

impl RemoteSync for RsyncRemote {
    fn ensure_dir(&self, remote_dir: &str) -> Result<(), TransferError> {
        let output = self.run("ssh", &self.mkdir_args(remote_dir))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TransferError::CreateRemoteDir {
                dir: remote_dir.to_string(),
                reason: format_command_error(&output),
            })
        }
    }

    fn sync(&self, files: &[PathBuf], remote_dir: &str) -> Result<(), TransferError> {
        log::debug!(
            "rsync {} file(s) to {}",
            files.len(),
            sanitize::redact_remote(&format!("{}:{}", self.destination_host(), remote_dir))
        );
        let output = self.run("rsync", &self.rsync_args(files, remote_dir))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TransferError::Copy {
                dir: remote_dir.to_string(),
                reason: format_command_error(&output),
            })
        }
    }

    fn describe(&self) -> String {
        sanitize::redact_remote(&format!("{}:{}", self.destination_host(), self.ssh.port))
    }
}

/// Remote base mounted on the local filesystem.
pub struct LocalMirror;

impl LocalMirror {
    fn copy_file(src: &Path, dst: &Path) -> Result<bool, TransferError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |e: io::Error| TransferError::Io { path, source: e }
        };

        let src_len = std::fs::metadata(src).map_err(io_err(src))?.len();
        if let Ok(meta) = std::fs::metadata(dst) {
            if meta.is_file() && meta.len() == src_len {
                return Ok(false);
            }
        }

        // Content only; a plain copy would carry the permission bits over.
        let mut reader = File::open(src).map_err(io_err(src))?;
        let mut writer = File::create(dst).map_err(io_err(dst))?;
        io::copy(&mut reader, &mut writer).map_err(io_err(dst))?;
        Ok(true)
    }
}

impl RemoteSync for LocalMirror {
    fn ensure_dir(&self, remote_dir: &str) -> Result<(), TransferError> {
        std::fs::create_dir_all(remote_dir).map_err(|e| TransferError::CreateRemoteDir {
            dir: remote_dir.to_string(),
            reason: e.to_string(),
        })
    }

    fn sync(&self, files: &[PathBuf], remote_dir: &str) -> Result<(), TransferError> {
        let target = Path::new(remote_dir);
        let mut copied = 0usize;
        for file in files {
            let name = file.file_name().ok_or_else(|| TransferError::Copy {
                dir: remote_dir.to_string(),
                reason: format!("'{}' has no file name", sanitize::redact_path(file)),
            })?;
            if Self::copy_file(file, &target.join(name))? {
                copied += 1;
            }
        }
        log::debug!(
            "Mirrored {} of {} file(s) into {}",
            copied,
            files.len(),
            sanitize::hash_path(target)
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}
