/// Type definitions for the GitHub REST issue payloads this tool consumes.
///
/// Only the fields the renderer reads are modelled; serde ignores the rest, so a
/// full `GET /repos/{owner}/{repo}/issues/{number}` response deserializes as is.
///
/// Sources:
/// - issue object: `GET /repos/{owner}/{repo}/issues/{number}`
/// - comment list: the issue's `comments_url` (first page only)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Shared records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Milestone {
    pub title: String,
}

/// GitHub sends `"body": null` for an empty description.
fn nullable_body<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default, deserialize_with = "nullable_body")]
    pub body: String,
    pub user: User,
    #[serde(default)]
    pub milestone: Option<Milestone>,
    /// Comment count as reported by GitHub. Drives whether `comments_url` is fetched.
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub comments_url: String,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub user: User,
    /// `YYYY-MM-DDTHH:MM:SSZ`, always UTC.
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "nullable_body")]
    pub body: String,
}
