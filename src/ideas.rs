//! The idea store: the only module that reads or writes `ideas` rows.
//!
//! Three operations — create, list, upvote. The upvote increment runs
//! server-side in a single `UPDATE`, so concurrent upvotes on one idea
//! never lose updates; different ids never contend.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

pub const MAX_TEXT_CHARS: usize = 280;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Idea {
    pub id: i32,
    pub text: String,
    pub upvotes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UpvoteResult {
    pub id: i32,
    pub upvotes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Newest,
    Popular,
}

impl SortMode {
    /// Anything other than `popular` falls back to newest.
    pub fn from_param(value: &str) -> Self {
        match value {
            "popular" => Self::Popular,
            _ => Self::Newest,
        }
    }

    fn order_clause(self) -> &'static str {
        match self {
            // created_at tiebreak keeps pagination stable for equal upvotes
            Self::Popular => "upvotes DESC, created_at DESC",
            Self::Newest => "created_at DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Limit is clamped to [1, 100] with 20 as the default; a missing,
    /// non-numeric, or non-positive value means the default. Negative
    /// offsets read as 0.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l >= 1 => l.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };

        Self {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Last line of defense for idea text; handlers call through [`IdeaStore::create`]
/// so nothing over-length or blank is ever persisted.
pub fn validate_text(raw: &str) -> Result<&str, AppError> {
    let text = raw.trim();

    if text.is_empty() {
        return Err(AppError::Validation("Text is required".into()));
    }

    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "Text must be at most {MAX_TEXT_CHARS} characters"
        )));
    }

    Ok(text)
}

#[derive(Clone)]
pub struct IdeaStore {
    pool: PgPool,
}

impl IdeaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, raw_text: &str) -> Result<Idea, AppError> {
        let text = validate_text(raw_text)?;

        let idea = sqlx::query_as::<_, Idea>(
            "INSERT INTO ideas (text) VALUES ($1) RETURNING id, text, upvotes, created_at",
        )
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(idea)
    }

    pub async fn list(&self, page: Page, sort: SortMode) -> Result<Vec<Idea>, AppError> {
        let sql = format!(
            "SELECT id, text, upvotes, created_at FROM ideas ORDER BY {} LIMIT $1 OFFSET $2",
            sort.order_clause()
        );

        let ideas = sqlx::query_as::<_, Idea>(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(ideas)
    }

    pub async fn upvote(&self, id: i32) -> Result<UpvoteResult, AppError> {
        let row = sqlx::query_as::<_, UpvoteResult>(
            "UPDATE ideas SET upvotes = upvotes + 1 WHERE id = $1 RETURNING id, upvotes",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::NotFound("Idea not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed() {
        assert_eq!(validate_text("  Dark mode  ").unwrap(), "Dark mode");
    }

    #[test]
    fn empty_and_blank_text_rejected() {
        for raw in ["", "   ", "\n\t"] {
            assert!(matches!(
                validate_text(raw),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn text_length_bound_is_280_chars() {
        let at_limit = "x".repeat(MAX_TEXT_CHARS);
        assert_eq!(validate_text(&at_limit).unwrap(), at_limit);

        let over = "x".repeat(MAX_TEXT_CHARS + 1);
        assert!(matches!(validate_text(&over), Err(AppError::Validation(_))));
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let at_limit = "é".repeat(MAX_TEXT_CHARS);
        assert!(validate_text(&at_limit).is_ok());
    }

    #[test]
    fn limit_clamped_into_range() {
        assert_eq!(Page::clamped(Some(500), None).limit, MAX_LIMIT);
        assert_eq!(Page::clamped(Some(1), None).limit, 1);
        assert_eq!(Page::clamped(None, None).limit, DEFAULT_LIMIT);
    }

    #[test]
    fn bad_limit_and_offset_fall_back_to_defaults() {
        let page = Page::clamped(Some(-5), Some(-1));
        assert_eq!(page, Page { limit: DEFAULT_LIMIT, offset: 0 });

        assert_eq!(Page::clamped(Some(0), None).limit, DEFAULT_LIMIT);
        assert_eq!(Page::clamped(None, Some(7)).offset, 7);
    }

    #[test]
    fn sort_param_defaults_to_newest() {
        assert_eq!(SortMode::from_param("popular"), SortMode::Popular);
        assert_eq!(SortMode::from_param("newest"), SortMode::Newest);
        assert_eq!(SortMode::from_param("bogus"), SortMode::Newest);
        assert_eq!(SortMode::default(), SortMode::Newest);
    }

    #[test]
    fn popular_order_breaks_ties_on_created_at() {
        assert_eq!(
            SortMode::Popular.order_clause(),
            "upvotes DESC, created_at DESC"
        );
        assert_eq!(SortMode::Newest.order_clause(), "created_at DESC");
    }
}
