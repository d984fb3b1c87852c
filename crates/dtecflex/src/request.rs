//! Run parameters: the validated run date and the run key derived from it.

use std::fmt;

use chrono::{Local, NaiveDate};
use serde::{Serialize, Serializer};

use crate::category::Category;
use crate::error::ValidationError;

pub const LOCK_PREFIX: &str = "publish:lock:";
pub const META_PREFIX: &str = "publish:meta:";
pub const CHANNEL_PREFIX: &str = "publish:ch:";

/// An eight-digit `YYYYMMDD` date naming a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunDate(String);

impl RunDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidDate(input.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .map_err(|_| ValidationError::InvalidDate(input.to_string()))?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn today() -> Self {
        Self(Local::now().format("%Y%m%d").to_string())
    }

    /// Parses `input` when present, otherwise today's date.
    pub fn parse_or_today(input: Option<&str>) -> Result<Self, ValidationError> {
        match input {
            Some(s) if !s.trim().is_empty() => Self::parse(s),
            _ => Ok(Self::today()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RunDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Identity of one transfer run: `{prefix}{date}`, or `ALL:{date}` when no
/// category filter is given. Locking, metadata and the live channel are all
/// keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    date: RunDate,
    category: Option<Category>,
}

impl RunKey {
    pub fn new(date: RunDate, category: Option<Category>) -> Self {
        Self { date, category }
    }

    /// Validates raw trigger input into a key.
    pub fn from_input(date: Option<&str>, category: Option<&str>) -> Result<Self, ValidationError> {
        let date = RunDate::parse_or_today(date)?;
        let category = Category::normalize_optional(category)?;
        Ok(Self::new(date, category))
    }

    pub fn date(&self) -> &RunDate {
        &self.date
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn job_key(&self) -> String {
        match self.category {
            Some(c) => format!("{}{}", c.path_prefix(), self.date),
            None => format!("ALL:{}", self.date),
        }
    }

    pub fn lock_name(&self) -> String {
        format!("{}{}", LOCK_PREFIX, self.job_key())
    }

    pub fn meta_name(&self) -> String {
        format!("{}{}", META_PREFIX, self.job_key())
    }

    pub fn channel_name(&self) -> String {
        format!("{}{}", CHANNEL_PREFIX, self.job_key())
    }

    /// `LIKE` pattern over `REG_NOTICIA`, absent for category-less runs.
    pub fn registration_pattern(&self) -> Option<String> {
        self.category
            .map(|c| registration_pattern(c.path_prefix(), &self.date))
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_key())
    }
}

pub fn registration_pattern(prefix: char, date: &RunDate) -> String {
    format!("{}{}%", prefix, date)
}
