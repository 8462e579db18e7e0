/// Book model and catalog operations
///
/// This module provides the Book model: catalog entries with an
/// immutable owner, two visibility flags, and a derived rating.
///
/// A book's *rate* is never stored. It is the arithmetic mean of all
/// feedback notes for the book, rounded to one decimal place, and
/// 0.0 when no feedback exists. Queries compute the average on read
/// so the value stays consistent with concurrent feedback submission.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE books (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(255) NOT NULL,
///     author_name VARCHAR(255) NOT NULL,
///     isbn VARCHAR(20) NOT NULL,
///     synopsis TEXT NOT NULL,
///     cover_reference TEXT,
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     shareable BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::pagination::{Page, PageRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Book model representing a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Unique book ID
    pub id: Uuid,

    /// Owning user; immutable after creation
    pub owner_id: Uuid,

    /// Book title
    pub title: String,

    /// Author display name
    pub author_name: String,

    /// ISBN (free-form; validated at the request boundary)
    pub isbn: String,

    /// Synopsis shown in listings
    pub synopsis: String,

    /// Opaque reference into the cover asset store
    pub cover_reference: Option<String>,

    /// Archived books are withdrawn from every lending operation
    pub archived: bool,

    /// Only shareable books may be borrowed or reviewed
    pub shareable: bool,

    /// When the book was listed
    pub created_at: DateTime<Utc>,

    /// When the book was last updated
    pub updated_at: DateTime<Utc>,
}

/// Book row joined with its derived rating
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookWithRate {
    /// The book itself
    #[sqlx(flatten)]
    pub book: Book,

    /// Mean feedback note, not yet rounded (0.0 with no feedback)
    pub rate: f64,
}

/// Input for creating a new book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBook {
    /// Owning user (the authenticated caller)
    pub owner_id: Uuid,

    /// Book title
    pub title: String,

    /// Author display name
    pub author_name: String,

    /// ISBN
    pub isbn: String,

    /// Synopsis
    pub synopsis: String,

    /// Whether the book is immediately shareable
    pub shareable: bool,
}

/// Rounds a raw mean note to the displayed one-decimal rate
pub fn round_rate(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

const BOOK_COLUMNS: &str = "id, owner_id, title, author_name, isbn, synopsis, \
     cover_reference, archived, shareable, created_at, updated_at";

impl Book {
    /// Creates a new book owned by the caller
    ///
    /// Books start un-archived; `shareable` is taken from the request.
    pub async fn create(pool: &PgPool, data: CreateBook) -> Result<Self, sqlx::Error> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (owner_id, title, author_name, isbn, synopsis, shareable)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, title, author_name, isbn, synopsis,
                      cover_reference, archived, shareable, created_at, updated_at
            "#,
        )
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.author_name)
        .bind(data.isbn)
        .bind(data.synopsis)
        .bind(data.shareable)
        .fetch_one(pool)
        .await?;

        Ok(book)
    }

    /// Finds a book by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(book)
    }

    /// Computes the book's raw mean note
    ///
    /// Returns 0.0 when the book has no feedback. Callers round via
    /// [`round_rate`] for display.
    pub async fn rate(pool: &PgPool, id: Uuid) -> Result<f64, sqlx::Error> {
        let (rate,): (f64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(AVG(note), 0.0)
            FROM feedbacks
            WHERE book_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(rate)
    }

    /// Updates the shareable flag
    ///
    /// Ownership is checked by the caller before this runs.
    pub async fn set_shareable(
        pool: &PgPool,
        id: Uuid,
        shareable: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET shareable = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(shareable)
        .fetch_optional(pool)
        .await?;

        Ok(book)
    }

    /// Updates the archived flag
    ///
    /// Ownership is checked by the caller before this runs.
    pub async fn set_archived(
        pool: &PgPool,
        id: Uuid,
        archived: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET archived = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(archived)
        .fetch_optional(pool)
        .await?;

        Ok(book)
    }

    /// Records the cover asset reference returned by the store
    pub async fn set_cover_reference(
        pool: &PgPool,
        id: Uuid,
        reference: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE books SET cover_reference = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(reference)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists books displayable to a viewer, newest first
    ///
    /// Displayable means not archived, shareable, and not owned by
    /// the viewer (a user's own books live in the owner listing).
    pub async fn list_displayable(
        pool: &PgPool,
        viewer_id: Uuid,
        request: &PageRequest,
    ) -> Result<Page<BookWithRate>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BookWithRate>(
            r#"
            SELECT b.id, b.owner_id, b.title, b.author_name, b.isbn, b.synopsis,
                   b.cover_reference, b.archived, b.shareable, b.created_at, b.updated_at,
                   COALESCE(AVG(f.note), 0.0) AS rate
            FROM books b
            LEFT JOIN feedbacks f ON f.book_id = b.id
            WHERE NOT b.archived AND b.shareable AND b.owner_id <> $1
            GROUP BY b.id
            ORDER BY b.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(viewer_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM books
            WHERE NOT archived AND shareable AND owner_id <> $1
            "#,
        )
        .bind(viewer_id)
        .fetch_one(pool)
        .await?;

        Ok(Page::new(rows, request, total))
    }

    /// Lists books owned by a user, newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        request: &PageRequest,
    ) -> Result<Page<BookWithRate>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BookWithRate>(
            r#"
            SELECT b.id, b.owner_id, b.title, b.author_name, b.isbn, b.synopsis,
                   b.cover_reference, b.archived, b.shareable, b.created_at, b.updated_at,
                   COALESCE(AVG(f.note), 0.0) AS rate
            FROM books b
            LEFT JOIN feedbacks f ON f.book_id = b.id
            WHERE b.owner_id = $1
            GROUP BY b.id
            ORDER BY b.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM books WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(pool)
                .await?;

        Ok(Page::new(rows, request, total))
    }
}
