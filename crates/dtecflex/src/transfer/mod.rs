//! Moves a record's media files from the local media base to the remote
//! base and advances the record to transferred.

pub mod executor;
pub mod paths;
pub mod remote;

pub use executor::{remote_from_config, FileTransferExecutor, MovedFiles};
pub use paths::{resolve_local_files, transfer_paths, TransferPaths};
pub use remote::{LocalMirror, RemoteSync, RsyncRemote};
