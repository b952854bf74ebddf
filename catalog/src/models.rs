use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{CatalogError, Result};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;
pub const MIN_YEAR: i64 = 1000;

/// A tagging entity: category or genre. Both are (name, unique slug).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    #[serde(skip_serializing, default)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A catalogued work as returned by reads: nested category and genres plus
/// the computed rating.
#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category: Option<Tag>,
    pub genre: Vec<Tag>,
    /// Mean review score; absent when the title has no reviews.
    pub rating: Option<f64>,
}

/// Raw title row before category/genre/rating attachment.
#[derive(Debug, Clone, FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub rating: Option<f64>,
}

/// Write payload for titles; category and genres arrive as slugs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTitle {
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
}

/// Partial title update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genre: Option<Vec<String>>,
}

/// List filters for titles.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    /// Substring match on the name.
    pub name: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Genre slug.
    pub genre: Option<String>,
    pub year: Option<i64>,
}

/// One user's evaluation of one title.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub title_id: i64,
    #[serde(skip_serializing)]
    pub author_id: String,
    /// Author username, joined in for presentation.
    pub author: String,
    pub text: String,
    pub score: i64,
    pub pub_date: DateTime<Utc>,
}

/// A reply to a review. The author survives account deletion as null.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    #[serde(skip_serializing)]
    pub author_id: Option<String>,
    pub author: Option<String>,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

/// Score bounds check, run on review create and update.
pub fn validate_score(score: i64) -> Result<()> {
    if score < MIN_SCORE {
        return Err(CatalogError::Validation(
            "The minimum score must be 1".to_string(),
        ));
    }
    if score > MAX_SCORE {
        return Err(CatalogError::Validation(
            "The maximum score must be 10".to_string(),
        ));
    }
    Ok(())
}

/// Year bounds check against the current calendar year.
pub fn validate_year(year: i64) -> Result<()> {
    let current = i64::from(Utc::now().year());
    if year < MIN_YEAR || year > current {
        return Err(CatalogError::Validation(format!(
            "{year} is not a correct year!"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        for score in MIN_SCORE..=MAX_SCORE {
            assert!(validate_score(score).is_ok());
        }

        let err = validate_score(0).unwrap_err();
        assert_eq!(err.to_string(), "The minimum score must be 1");

        let err = validate_score(11).unwrap_err();
        assert_eq!(err.to_string(), "The maximum score must be 10");
    }

    #[test]
    fn test_year_bounds() {
        assert!(validate_year(1000).is_ok());
        assert!(validate_year(i64::from(Utc::now().year())).is_ok());
        assert!(validate_year(999).is_err());
        assert!(validate_year(i64::from(Utc::now().year()) + 1).is_err());
    }
}
