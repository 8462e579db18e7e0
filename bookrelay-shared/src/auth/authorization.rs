/// Lending eligibility rules
///
/// Every lending-adjacent operation (borrow, return, approve, submit
/// feedback, flag updates) runs the same small set of checks before it
/// touches the ledger. They are pure functions over the book row and
/// the caller's identity, so route handlers stay thin and the rules
/// are testable without a database.
///
/// # Rules
///
/// - Archived or non-shareable books are withdrawn from circulation
/// - Owners do not borrow or review their own books
/// - Only the owner flips a book's visibility flags
///
/// # Example
///
/// ```no_run
/// # use bookrelay_shared::auth::authorization::{ensure_available, ensure_not_owner};
/// # use bookrelay_shared::models::book::Book;
/// # use uuid::Uuid;
/// # fn example(book: &Book, caller: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// ensure_available(book)?;
/// ensure_not_owner(book, caller)?;
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::models::book::Book;

/// Error type for lending eligibility checks
#[derive(Debug, thiserror::Error)]
pub enum LendingError {
    /// Book is archived or not shareable
    #[error("Book {0} is not available for lending")]
    BookUnavailable(Uuid),

    /// Caller owns the book and the operation requires a non-owner
    #[error("Owners cannot perform this operation on their own book")]
    OwnBook,

    /// Caller does not own the book and the operation requires the owner
    #[error("Only the book owner can perform this operation")]
    NotOwner,

    /// Caller is the borrower of the loan being approved
    #[error("Borrowers cannot approve their own return")]
    SelfApproval,
}

/// Checks that a book is in circulation
///
/// A book is available when it is not archived and is shareable.
/// Availability is evaluated at operation time, so withdrawing a book
/// mid-loan blocks the return and approval steps too.
pub fn ensure_available(book: &Book) -> Result<(), LendingError> {
    if book.archived || !book.shareable {
        return Err(LendingError::BookUnavailable(book.id));
    }

    Ok(())
}

/// Checks that the caller is not the book's owner
pub fn ensure_not_owner(book: &Book, caller_id: Uuid) -> Result<(), LendingError> {
    if book.owner_id == caller_id {
        return Err(LendingError::OwnBook);
    }

    Ok(())
}

/// Checks that the caller owns the book
pub fn ensure_owner(book: &Book, caller_id: Uuid) -> Result<(), LendingError> {
    if book.owner_id != caller_id {
        return Err(LendingError::NotOwner);
    }

    Ok(())
}

/// Checks that the caller is not the borrower on a loan
///
/// The approval step rejects the borrower; any other authenticated
/// caller that can see the pending loan through the owner join may
/// approve it.
pub fn ensure_not_borrower(borrower_id: Uuid, caller_id: Uuid) -> Result<(), LendingError> {
    if borrower_id == caller_id {
        return Err(LendingError::SelfApproval);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book(owner_id: Uuid, archived: bool, shareable: bool) -> Book {
        Book {
            id: Uuid::new_v4(),
            owner_id,
            title: "The Left Hand of Darkness".to_string(),
            author_name: "Ursula K. Le Guin".to_string(),
            isbn: "9780441478125".to_string(),
            synopsis: "An envoy alone on a frozen world".to_string(),
            cover_reference: None,
            archived,
            shareable,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ensure_available() {
        let owner = Uuid::new_v4();

        assert!(ensure_available(&book(owner, false, true)).is_ok());

        // Archived, not shareable, or both
        assert!(ensure_available(&book(owner, true, true)).is_err());
        assert!(ensure_available(&book(owner, false, false)).is_err());
        assert!(ensure_available(&book(owner, true, false)).is_err());
    }

    #[test]
    fn test_ensure_not_owner() {
        let owner = Uuid::new_v4();
        let book = book(owner, false, true);

        assert!(ensure_not_owner(&book, Uuid::new_v4()).is_ok());
        assert!(matches!(
            ensure_not_owner(&book, owner),
            Err(LendingError::OwnBook)
        ));
    }

    #[test]
    fn test_ensure_owner() {
        let owner = Uuid::new_v4();
        let book = book(owner, false, true);

        assert!(ensure_owner(&book, owner).is_ok());
        assert!(matches!(
            ensure_owner(&book, Uuid::new_v4()),
            Err(LendingError::NotOwner)
        ));
    }

    #[test]
    fn test_ensure_not_borrower() {
        let borrower = Uuid::new_v4();

        assert!(ensure_not_borrower(borrower, Uuid::new_v4()).is_ok());
        assert!(matches!(
            ensure_not_borrower(borrower, borrower),
            Err(LendingError::SelfApproval)
        ));
    }
}
