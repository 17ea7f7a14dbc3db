use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// A single scheduled lesson taken from the calendar export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Start as wall-clock time of the service's locale, `None` without DTSTART
    pub start: Option<NaiveDateTime>,
    /// End as wall-clock time of the service's locale, `None` without DTEND
    pub end: Option<NaiveDateTime>,
    /// Lecture title as published by the service
    pub summary: String,
    /// Service supplied UID
    pub id: String,
    /// Room/building, may be empty
    pub location: String,
    /// Free text, may be empty
    pub description: String,
}

impl Lesson {
    /// Localize the start time in `tz`.
    ///
    /// Returns `None` when the lesson has no start or the wall-clock time does
    /// not exist in `tz` (spring DST gap). Ambiguous times pick the earlier
    /// offset.
    pub fn start_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        self.start
            .and_then(|naive| tz.from_local_datetime(&naive).earliest())
    }

    /// Localize the end time in `tz`, same rules as [`Lesson::start_in`].
    pub fn end_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        self.end.and_then(|naive| tz.from_local_datetime(&naive).earliest())
    }
}

/// Semester ("planning unit") as listed by `m=getpus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub id: i64,
    pub name: String,
    #[serde(rename = "shortname", default)]
    pub short_name: String,
    #[serde(rename = "startdate", default)]
    pub start_date: String,
    #[serde(rename = "enddate", default)]
    pub end_date: String,
    #[serde(rename = "dateasdefault", default)]
    pub date_as_default: bool,
    #[serde(rename = "visibleonweb", default)]
    pub visible_on_web: bool,
}

/// Study program ("organisational group") of a semester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyProgram {
    pub id: i64,
    pub name: String,
    #[serde(rename = "shortname", default)]
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: i64,
    pub name: String,
    #[serde(rename = "shortname", default)]
    pub short_name: String,
}

/// Group of a study program together with its lectures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(rename = "shortname", default)]
    pub short_name: String,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
}

/// User credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Login body: `username&password`
    pub(crate) fn login_body(&self) -> String {
        format!("{}&{}", self.username, self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated session, identified by the `JSESSIONID` cookie value
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Cookie` request header
    pub(crate) fn cookie_header(&self) -> String {
        format!("{}={}", crate::cookie::SESSION_COOKIE, self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the service, the `json` and `ical` endpoints live below it
    pub base_url: String,
    /// Transport deadline per request
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Language requested from the calendar export
    pub language: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://splan.hdm-stuttgart.de/splan/".to_string(),
            timeout_secs: 30,
            user_agent: concat!("StarPlan-Rust/", env!("CARGO_PKG_VERSION")).to_string(),
            language: "de".to_string(),
        }
    }
}

/// Result of walking from the saved view down to the group's calendar
#[derive(Debug, Clone, Serialize)]
pub struct MyTimetable {
    pub semester: Semester,
    pub study_program: StudyProgram,
    pub group: Group,
    /// Lessons ordered by start time
    pub lessons: Vec<Lesson>,
}
