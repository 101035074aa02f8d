#[cfg(feature = "ssr")]
use chrono::NaiveDateTime;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
#[cfg(feature = "ssr")]
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Class levels a contest can belong to, in display order.
pub const CLASS_LEVELS: [i32; 4] = [9, 10, 11, 12];
pub const YEARS: RangeInclusive<i32> = 2000..=2100;
pub const PRE_NUMBERS: RangeInclusive<i32> = 1..=5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ssr", derive(Queryable, Selectable))]
#[cfg_attr(feature = "ssr", diesel(table_name = crate::schema::contests))]
#[cfg_attr(feature = "ssr", diesel(check_for_backend(Sqlite)))]
pub struct Contest {
    pub id: i32,
    pub class_level: i32,
    pub year: i32,
    pub pre_number: i32,
    pub contest_url: Option<String>,
    pub solution_url: Option<String>,
}

/// A contest without its id. Used as the create body and, on the server, as the full-row
/// changeset for updates (absent URLs are written as NULL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ssr", derive(Insertable, AsChangeset))]
#[cfg_attr(
    feature = "ssr",
    diesel(table_name = crate::schema::contests, treat_none_as_null = true)
)]
pub struct NewContest {
    pub class_level: i32,
    pub year: i32,
    pub pre_number: i32,
    #[serde(default)]
    pub contest_url: Option<String>,
    #[serde(default)]
    pub solution_url: Option<String>,
}

/// Partial update body. Absent fields keep their stored value; a present but empty URL clears
/// the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidContest {
    #[error("Class level must be between 9 and 12")]
    ClassLevel(i32),
    #[error("Year must be between 2000 and 2100")]
    Year(i32),
    #[error("Pre number must be between 1 and 5")]
    PreNumber(i32),
    #[error("{0} must be an http(s) URL")]
    Url(&'static str),
}

impl NewContest {
    /// Trims the URLs and turns blank ones into `None`.
    pub fn normalized(mut self) -> Self {
        self.contest_url = normalize_url(self.contest_url);
        self.solution_url = normalize_url(self.solution_url);
        self
    }

    pub fn validate(&self) -> Result<(), InvalidContest> {
        if !CLASS_LEVELS.contains(&self.class_level) {
            return Err(InvalidContest::ClassLevel(self.class_level));
        }
        if !YEARS.contains(&self.year) {
            return Err(InvalidContest::Year(self.year));
        }
        if !PRE_NUMBERS.contains(&self.pre_number) {
            return Err(InvalidContest::PreNumber(self.pre_number));
        }
        if !self.contest_url.as_deref().map_or(true, looks_like_url) {
            return Err(InvalidContest::Url("Contest URL"));
        }
        if !self.solution_url.as_deref().map_or(true, looks_like_url) {
            return Err(InvalidContest::Url("Solution URL"));
        }
        Ok(())
    }
}

impl From<&Contest> for NewContest {
    fn from(contest: &Contest) -> Self {
        NewContest {
            class_level: contest.class_level,
            year: contest.year,
            pre_number: contest.pre_number,
            contest_url: contest.contest_url.clone(),
            solution_url: contest.solution_url.clone(),
        }
    }
}

impl ContestUpdate {
    /// Merges this update over `contest`, producing the full row to store.
    pub fn apply_to(self, contest: &Contest) -> NewContest {
        NewContest {
            class_level: self.class_level.unwrap_or(contest.class_level),
            year: self.year.unwrap_or(contest.year),
            pre_number: self.pre_number.unwrap_or(contest.pre_number),
            contest_url: match self.contest_url {
                Some(url) => Some(url),
                None => contest.contest_url.clone(),
            },
            solution_url: match self.solution_url {
                Some(url) => Some(url),
                None => contest.solution_url.clone(),
            },
        }
        .normalized()
    }
}

// An edit form always submits every field, so a missing URL has to be sent as "" to clear it.
impl From<NewContest> for ContestUpdate {
    fn from(contest: NewContest) -> Self {
        ContestUpdate {
            class_level: Some(contest.class_level),
            year: Some(contest.year),
            pre_number: Some(contest.pre_number),
            contest_url: Some(contest.contest_url.unwrap_or_default()),
            solution_url: Some(contest.solution_url.unwrap_or_default()),
        }
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

fn looks_like_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => !rest.is_empty() && !rest.chars().any(char::is_whitespace),
        None => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Error body returned by every failing API route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[cfg(feature = "ssr")]
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::admin_sessions)]
#[diesel(check_for_backend(Sqlite))]
pub struct AdminSession {
    pub id: i32,
    pub token: String,
    pub created_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::admin_sessions)]
pub struct NewAdminSession {
    pub token: String,
    // created_at uses default
}
