/// Loan model and the lending ledger state machine
///
/// A loan tracks one borrow-to-close cycle for a (book, borrower)
/// pair. Its state is derived from two independent flags:
///
/// # State Machine
///
/// ```text
/// Borrowed        (returned = false)
///   → PendingApproval (returned = true,  return_approved = false)
///     → Closed        (return_approved = true)
/// ```
///
/// `return_approved` implies `returned`: the approval transition only
/// matches rows already in PendingApproval, so the flag pair never
/// goes inconsistent.
///
/// At most one open (not yet return-approved) loan exists per book,
/// enforced by a partial unique index. [`Loan::borrow`] folds the
/// eligibility check and the insert into one guarded statement, so
/// two concurrent borrow calls cannot both observe "no open loan"
/// and both insert.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE book_loans (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     borrower_id UUID NOT NULL REFERENCES users(id),
///     returned BOOLEAN NOT NULL DEFAULT FALSE,
///     return_approved BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX idx_book_loans_one_open
///     ON book_loans(book_id) WHERE NOT return_approved;
/// ```

use crate::pagination::{Page, PageRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Lending state derived from the two loan flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    /// The borrower holds the book
    Borrowed,

    /// The borrower reported the return; the owner has not approved
    PendingApproval,

    /// The owner approved the return; the cycle is complete
    Closed,
}

impl LoanState {
    /// Derives the state from the stored flag pair
    pub fn from_flags(returned: bool, return_approved: bool) -> Self {
        match (returned, return_approved) {
            (false, _) => LoanState::Borrowed,
            (true, false) => LoanState::PendingApproval,
            (true, true) => LoanState::Closed,
        }
    }

    /// Whether the loan still blocks another borrow of the book
    pub fn is_open(&self) -> bool {
        !matches!(self, LoanState::Closed)
    }
}

/// Loan record tracking one borrow-to-close cycle
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    /// Unique loan ID
    pub id: Uuid,

    /// The borrowed book
    pub book_id: Uuid,

    /// The borrower
    pub borrower_id: Uuid,

    /// Whether the borrower reported the return
    pub returned: bool,

    /// Whether the owner approved the return
    pub return_approved: bool,

    /// When the loan was created (borrow time)
    pub created_at: DateTime<Utc>,

    /// When the loan was last updated
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Current state of this loan
    pub fn state(&self) -> LoanState {
        LoanState::from_flags(self.returned, self.return_approved)
    }
}

/// Loan joined with its book's display fields, for borrower/owner listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanWithBook {
    /// Loan ID
    pub id: Uuid,

    /// Borrowed book ID
    pub book_id: Uuid,

    /// Book title
    pub title: String,

    /// Book author
    pub author_name: String,

    /// Book ISBN
    pub isbn: String,

    /// Mean feedback note for the book, not yet rounded
    pub rate: f64,

    /// Whether the borrower reported the return
    pub returned: bool,

    /// Whether the owner approved the return
    pub return_approved: bool,

    /// Borrow time
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Creates a Borrowed loan if and only if the book has no open loan
    ///
    /// The existence check and the insert run as a single guarded
    /// statement, backed by the partial unique index, so concurrent
    /// borrow attempts on the same book cannot both succeed.
    ///
    /// # Returns
    ///
    /// The new loan, or None when an open loan already exists.
    pub async fn borrow(
        pool: &PgPool,
        book_id: Uuid,
        borrower_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        // ON CONFLICT DO NOTHING covers the race where a concurrent
        // insert lands between the EXISTS check and the write; the
        // partial unique index rejects it and we observe None.
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO book_loans (book_id, borrower_id)
            SELECT $1, $2
            WHERE NOT EXISTS (
                SELECT 1 FROM book_loans
                WHERE book_id = $1 AND NOT return_approved
            )
            ON CONFLICT DO NOTHING
            RETURNING id, book_id, borrower_id, returned, return_approved,
                      created_at, updated_at
            "#,
        )
        .bind(book_id)
        .bind(borrower_id)
        .fetch_optional(pool)
        .await?;

        Ok(loan)
    }

    /// Transitions the borrower's Borrowed loan to PendingApproval
    ///
    /// Only matches a loan in state Borrowed for this exact
    /// (book, borrower) pair, so a second return finds nothing.
    ///
    /// # Returns
    ///
    /// The updated loan, or None when no Borrowed loan exists for
    /// the pair.
    pub async fn mark_returned(
        pool: &PgPool,
        book_id: Uuid,
        borrower_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE book_loans
            SET returned = TRUE,
                updated_at = NOW()
            WHERE book_id = $1
              AND borrower_id = $2
              AND NOT returned
            RETURNING id, book_id, borrower_id, returned, return_approved,
                      created_at, updated_at
            "#,
        )
        .bind(book_id)
        .bind(borrower_id)
        .fetch_optional(pool)
        .await?;

        Ok(loan)
    }

    /// Looks up the book's PendingApproval loan, keyed by the book's owner
    ///
    /// The lookup is anchored on `books.owner_id` matching the caller,
    /// not on the borrower: approval belongs to whoever the ledger
    /// says owns the book.
    pub async fn find_pending_approval(
        pool: &PgPool,
        book_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT l.id, l.book_id, l.borrower_id, l.returned, l.return_approved,
                   l.created_at, l.updated_at
            FROM book_loans l
            JOIN books b ON b.id = l.book_id
            WHERE l.book_id = $1
              AND b.owner_id = $2
              AND l.returned
              AND NOT l.return_approved
            "#,
        )
        .bind(book_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(loan)
    }

    /// Transitions a PendingApproval loan to Closed
    ///
    /// Guarded on the PendingApproval flags, so a second approval of
    /// the same loan matches nothing.
    pub async fn approve_return(pool: &PgPool, loan_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE book_loans
            SET return_approved = TRUE,
                updated_at = NOW()
            WHERE id = $1
              AND returned
              AND NOT return_approved
            RETURNING id, book_id, borrower_id, returned, return_approved,
                      created_at, updated_at
            "#,
        )
        .bind(loan_id)
        .fetch_optional(pool)
        .await?;

        Ok(loan)
    }

    /// Lists the caller's loans that are not yet return-approved, newest first
    pub async fn list_borrowed_by_user(
        pool: &PgPool,
        borrower_id: Uuid,
        request: &PageRequest,
    ) -> Result<Page<LoanWithBook>, sqlx::Error> {
        let rows = sqlx::query_as::<_, LoanWithBook>(
            r#"
            SELECT l.id, l.book_id, b.title, b.author_name, b.isbn,
                   COALESCE(AVG(f.note), 0.0) AS rate,
                   l.returned, l.return_approved, l.created_at
            FROM book_loans l
            JOIN books b ON b.id = l.book_id
            LEFT JOIN feedbacks f ON f.book_id = b.id
            WHERE l.borrower_id = $1 AND NOT l.return_approved
            GROUP BY l.id, b.id
            ORDER BY l.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(borrower_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM book_loans WHERE borrower_id = $1 AND NOT return_approved",
        )
        .bind(borrower_id)
        .fetch_one(pool)
        .await?;

        Ok(Page::new(rows, request, total))
    }

    /// Lists returns awaiting the caller's approval, newest first
    ///
    /// Keyed by the book owner: these are loans on the caller's books
    /// in state PendingApproval.
    pub async fn list_returned_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        request: &PageRequest,
    ) -> Result<Page<LoanWithBook>, sqlx::Error> {
        let rows = sqlx::query_as::<_, LoanWithBook>(
            r#"
            SELECT l.id, l.book_id, b.title, b.author_name, b.isbn,
                   COALESCE(AVG(f.note), 0.0) AS rate,
                   l.returned, l.return_approved, l.created_at
            FROM book_loans l
            JOIN books b ON b.id = l.book_id
            LEFT JOIN feedbacks f ON f.book_id = b.id
            WHERE b.owner_id = $1 AND l.returned AND NOT l.return_approved
            GROUP BY l.id, b.id
            ORDER BY l.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM book_loans l
            JOIN books b ON b.id = l.book_id
            WHERE b.owner_id = $1 AND l.returned AND NOT l.return_approved
            "#,
        )
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

        Ok(Page::new(rows, request, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_flags() {
        assert_eq!(LoanState::from_flags(false, false), LoanState::Borrowed);
        assert_eq!(
            LoanState::from_flags(true, false),
            LoanState::PendingApproval
        );
        assert_eq!(LoanState::from_flags(true, true), LoanState::Closed);
    }

    #[test]
    fn test_approved_but_unreturned_reads_as_borrowed() {
        // The flag pair (returned=false, return_approved=true) is
        // unreachable through the transitions; derivation treats the
        // returned flag as authoritative.
        assert_eq!(LoanState::from_flags(false, true), LoanState::Borrowed);
    }

    #[test]
    fn test_is_open() {
        assert!(LoanState::Borrowed.is_open());
        assert!(LoanState::PendingApproval.is_open());
        assert!(!LoanState::Closed.is_open());
    }

    #[test]
    fn test_loan_state_accessor() {
        let mut loan = Loan {
            id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            borrower_id: Uuid::new_v4(),
            returned: false,
            return_approved: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(loan.state(), LoanState::Borrowed);

        loan.returned = true;
        assert_eq!(loan.state(), LoanState::PendingApproval);

        loan.return_approved = true;
        assert_eq!(loan.state(), LoanState::Closed);
    }
}
