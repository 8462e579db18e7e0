/// Feedback model
///
/// A feedback row is a numeric note plus a free-text comment,
/// attributed to exactly one book and one author. Feedback never
/// touches the lending ledger; the only derived value is the book's
/// mean note, computed on read (see `models::book`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE feedbacks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     author_id UUID NOT NULL REFERENCES users(id),
///     note DOUBLE PRECISION NOT NULL,
///     comment TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::pagination::{Page, PageRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Feedback model representing one review of a book
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feedback {
    /// Unique feedback ID
    pub id: Uuid,

    /// Reviewed book
    pub book_id: Uuid,

    /// Review author
    pub author_id: Uuid,

    /// Numeric rating, validated to 0.0–5.0 at the request boundary
    pub note: f64,

    /// Free-text comment
    pub comment: String,

    /// When the feedback was submitted
    pub created_at: DateTime<Utc>,
}

/// Input for submitting feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedback {
    /// Reviewed book
    pub book_id: Uuid,

    /// Review author (the authenticated caller)
    pub author_id: Uuid,

    /// Numeric rating
    pub note: f64,

    /// Free-text comment
    pub comment: String,
}

impl Feedback {
    /// Persists a feedback row
    ///
    /// Eligibility (book available, author not the owner) is checked
    /// by the caller before this runs.
    pub async fn create(pool: &PgPool, data: CreateFeedback) -> Result<Self, sqlx::Error> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedbacks (book_id, author_id, note, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, book_id, author_id, note, comment, created_at
            "#,
        )
        .bind(data.book_id)
        .bind(data.author_id)
        .bind(data.note)
        .bind(data.comment)
        .fetch_one(pool)
        .await?;

        Ok(feedback)
    }

    /// Lists feedback for a book, newest first
    pub async fn list_by_book(
        pool: &PgPool,
        book_id: Uuid,
        request: &PageRequest,
    ) -> Result<Page<Feedback>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT id, book_id, author_id, note, comment, created_at
            FROM feedbacks
            WHERE book_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(book_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM feedbacks WHERE book_id = $1")
                .bind(book_id)
                .fetch_one(pool)
                .await?;

        Ok(Page::new(rows, request, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_feedback_struct() {
        let create = CreateFeedback {
            book_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            note: 4.5,
            comment: "Great condition".to_string(),
        };
        assert_eq!(create.note, 4.5);
    }
}
