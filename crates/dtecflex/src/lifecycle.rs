//! Record lifecycle status as stored in `TB_NOTICIA_RASPADA.STATUS`.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATUS_APPROVED: &str = "201-APPROVED";
// Spelling matches the values already stored in production.
pub const STATUS_TRANSFERRED: &str = "205-TRANSFERED";
pub const STATUS_PUBLISHED: &str = "203-PUBLISHED";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    Approved,
    Transferred,
    Published,
    /// Administrative states outside the pipeline (edit, rejected, ...).
    Other(String),
}

impl RecordStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            STATUS_APPROVED => RecordStatus::Approved,
            STATUS_TRANSFERRED => RecordStatus::Transferred,
            STATUS_PUBLISHED => RecordStatus::Published,
            other => RecordStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::Approved => STATUS_APPROVED,
            RecordStatus::Transferred => STATUS_TRANSFERRED,
            RecordStatus::Published => STATUS_PUBLISHED,
            RecordStatus::Other(s) => s,
        }
    }

    fn rank(&self) -> Option<u8> {
        match self {
            RecordStatus::Approved => Some(0),
            RecordStatus::Transferred => Some(1),
            RecordStatus::Published => Some(2),
            RecordStatus::Other(_) => None,
        }
    }

    /// True when `next` is the single forward step after `self`.
    pub fn can_advance_to(&self, next: &RecordStatus) -> bool {
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to == from + 1,
            _ => false,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RecordStatus {
    fn from(s: String) -> Self {
        RecordStatus::parse(&s)
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        status.as_str().to_string()
    }
}
