use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    #[default]
    Available,
    Borrowed,
    Unavailable,
}

impl BookStatus {
    pub const ALL: [BookStatus; 3] = [BookStatus::Available, BookStatus::Borrowed, BookStatus::Unavailable];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
            BookStatus::Unavailable => "unavailable",
        }
    }

    /// Exact, case-sensitive match against the stored spelling.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub author: String,
    pub publicationyear: i64,
    pub status: BookStatus,
    pub createdat: DateTime<Utc>,
    pub updatedat: DateTime<Utc>,
}

/// A fully defaulted, sanitized row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub description: String,
    pub author: String,
    pub publicationyear: i64,
    pub status: BookStatus,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publicationyear: Option<i64>,
    pub status: Option<BookStatus>,
}

impl BookChanges {
    pub fn apply(self, existing: &Book) -> NewBook {
        NewBook {
            title: self.title.unwrap_or_else(|| existing.title.clone()),
            description: self.description.unwrap_or_else(|| existing.description.clone()),
            author: self.author.unwrap_or_else(|| existing.author.clone()),
            publicationyear: self.publicationyear.unwrap_or(existing.publicationyear),
            status: self.status.unwrap_or(existing.status),
        }
    }
}

/// Conjunction of exact-match filters for listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub status: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Book {
        let now = Utc::now();
        Book {
            id: 7,
            title: "Dune".to_string(),
            description: "Spice".to_string(),
            author: "Herbert".to_string(),
            publicationyear: 1965,
            status: BookStatus::Borrowed,
            createdat: now,
            updatedat: now,
        }
    }

    #[test]
    fn status_parse_is_exact() {
        assert_eq!(BookStatus::parse("borrowed"), Some(BookStatus::Borrowed));
        assert_eq!(BookStatus::parse("Borrowed"), None);
        assert_eq!(BookStatus::parse("archived"), None);
        assert_eq!(BookStatus::default(), BookStatus::Available);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&BookStatus::Unavailable).unwrap();
        assert_eq!(json, "\"unavailable\"");
    }

    #[test]
    fn empty_changes_keep_everything() {
        let existing = stored();
        let merged = BookChanges::default().apply(&existing);
        assert_eq!(merged.title, "Dune");
        assert_eq!(merged.author, "Herbert");
        assert_eq!(merged.publicationyear, 1965);
        assert_eq!(merged.status, BookStatus::Borrowed);
    }

    #[test]
    fn present_fields_overwrite() {
        let changes = BookChanges {
            status: Some(BookStatus::Available),
            publicationyear: Some(0),
            ..Default::default()
        };
        let merged = changes.apply(&stored());
        assert_eq!(merged.title, "Dune");
        assert_eq!(merged.status, BookStatus::Available);
        assert_eq!(merged.publicationyear, 0);
    }
}
