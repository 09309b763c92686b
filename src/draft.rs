//! Bookmark form state and the checks run on it before anything is sent.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};

use crate::config::{Config, Visibility};
use crate::error::ValidationError;
use crate::template::fill_content_template;

/// Pre-filled bookmark form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookmarkDraft {
    pub url: String,
    pub title: String,
    pub content: String,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    /// Whether the connection settings are complete.
    pub configured: bool,
    /// Whether a memo already mentions this URL.
    pub duplicated: bool,
}

impl BookmarkDraft {
    /// Fills the draft from the stored template and default visibility.
    pub fn new(config: &Config, url: &str, title: &str) -> BookmarkDraft {
        BookmarkDraft {
            url: url.to_string(),
            title: title.to_string(),
            content: fill_content_template(&config.content_template, title, url),
            visibility: config.default_visibility.name,
            tags: Vec::new(),
            configured: config.is_configured(),
            duplicated: false,
        }
    }

    /// Content sent to the server: the body followed by any tags not
    /// already written into it.
    pub fn memo_content(&self) -> String {
        let missing: Vec<String> = self
            .tags
            .iter()
            .map(|t| format!("#{}", t))
            .filter(|t| !self.content.split_whitespace().any(|w| w == t))
            .collect();
        if missing.is_empty() {
            return self.content.clone();
        }
        let body = self.content.trim_end();
        if body.is_empty() {
            missing.join(" ")
        } else {
            format!("{}\n\n{}", body, missing.join(" "))
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::new("url", "a URL is required"));
        }
        if self.content.trim().is_empty() && self.tags.is_empty() {
            return Err(ValidationError::new("content", "content must not be empty"));
        }
        Ok(())
    }
}

/// Normalizes a tag as typed by the user: a leading `#` is dropped and
/// whitespace is rejected.
pub fn parse_tag(raw: &str) -> Result<String, ValidationError> {
    let tag = raw.trim().trim_start_matches('#');
    if tag.is_empty() {
        return Err(ValidationError::new("tags", "empty tag"));
    }
    if tag.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(
            "tags",
            format!("tag '{}' must not contain whitespace", tag),
        ));
    }
    Ok(tag.to_string())
}

/// Creation time for a back-dated memo, in local time.
///
/// `date` is `YYYY-MM-DD` and `time` is `HH:MM`; a missing time means
/// midnight.
pub fn create_time(date: &str, time: Option<&str>) -> Result<DateTime<Local>, ValidationError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ValidationError::new("date", format!("'{}' is not a YYYY-MM-DD date", date)))?;
    let at = match time.filter(|t| !t.is_empty()) {
        Some(t) => NaiveTime::parse_from_str(&format!("{}:00", t), "%H:%M:%S")
            .map_err(|_| ValidationError::new("time", format!("'{}' is not an HH:MM time", t)))?,
        None => NaiveTime::MIN,
    };
    Local
        .from_local_datetime(&day.and_time(at))
        .earliest()
        .ok_or_else(|| ValidationError::new("time", "that time does not exist in the local time zone"))
}
