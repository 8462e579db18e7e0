/// Book catalog and lending endpoints
///
/// This module provides the catalog surface (create, get, listings,
/// visibility flags, covers) and the lending lifecycle (borrow,
/// return, approve return).
///
/// # Endpoints
///
/// - `POST  /v1/books` - List a new book
/// - `GET   /v1/books` - Displayable books for the caller
/// - `GET   /v1/books/owned` - Caller's own books
/// - `GET   /v1/books/borrowed` - Caller's active loans
/// - `GET   /v1/books/returned` - Returns awaiting the caller's approval
/// - `GET   /v1/books/:id` - One book with its rating
/// - `PATCH /v1/books/:id/shareable` - Flip the shareable flag (owner)
/// - `PATCH /v1/books/:id/archived` - Flip the archived flag (owner)
/// - `POST  /v1/books/:id/cover` - Upload a cover image
/// - `GET   /v1/books/:id/cover` - Read the cover image
/// - `POST  /v1/books/:id/borrow` - Borrow the book
/// - `PATCH /v1/books/:id/return` - Report the book returned
/// - `PATCH /v1/books/:id/return/approve` - Approve a reported return

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use bookrelay_shared::{
    auth::{
        authorization::{ensure_available, ensure_not_borrower, ensure_not_owner, ensure_owner},
        middleware::AuthContext,
    },
    models::{
        book::{round_rate, Book, BookWithRate, CreateBook},
        loan::{Loan, LoanWithBook},
    },
    pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Query parameters shared by all listing endpoints
#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Zero-based page number
    pub page: Option<i64>,

    /// Page size
    pub size: Option<i64>,
}

impl PageParams {
    fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookRequest {
    /// Book title
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,

    /// Author display name
    #[validate(length(min = 1, max = 255, message = "Author name is required"))]
    pub author_name: String,

    /// ISBN
    #[validate(length(min = 1, max = 20, message = "ISBN is required"))]
    pub isbn: String,

    /// Synopsis
    #[validate(length(min = 1, message = "Synopsis is required"))]
    pub synopsis: String,

    /// Whether the book is immediately shareable
    #[serde(default)]
    pub shareable: bool,
}

/// Book representation in responses
#[derive(Debug, Serialize)]
pub struct BookResponse {
    /// Book ID
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Book title
    pub title: String,

    /// Author display name
    pub author_name: String,

    /// ISBN
    pub isbn: String,

    /// Synopsis
    pub synopsis: String,

    /// Whether a cover has been uploaded
    pub has_cover: bool,

    /// Archived flag
    pub archived: bool,

    /// Shareable flag
    pub shareable: bool,

    /// Mean feedback note rounded to one decimal, 0.0 with no feedback
    pub rate: f64,

    /// When the book was listed
    pub created_at: DateTime<Utc>,
}

impl BookResponse {
    fn from_book(book: Book, rate: f64) -> Self {
        Self {
            id: book.id,
            owner_id: book.owner_id,
            title: book.title,
            author_name: book.author_name,
            isbn: book.isbn,
            synopsis: book.synopsis,
            has_cover: book.cover_reference.is_some(),
            archived: book.archived,
            shareable: book.shareable,
            rate: round_rate(rate),
            created_at: book.created_at,
        }
    }
}

impl From<BookWithRate> for BookResponse {
    fn from(row: BookWithRate) -> Self {
        let rate = row.rate;
        Self::from_book(row.book, rate)
    }
}

/// Loan representation in borrower/owner listings
#[derive(Debug, Serialize)]
pub struct LoanResponse {
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

    /// Book rating rounded to one decimal
    pub rate: f64,

    /// Whether the borrower reported the return
    pub returned: bool,

    /// Whether the owner approved the return
    pub return_approved: bool,

    /// Borrow time
    pub created_at: DateTime<Utc>,
}

impl From<LoanWithBook> for LoanResponse {
    fn from(row: LoanWithBook) -> Self {
        Self {
            id: row.id,
            book_id: row.book_id,
            title: row.title,
            author_name: row.author_name,
            isbn: row.isbn,
            rate: round_rate(row.rate),
            returned: row.returned,
            return_approved: row.return_approved,
            created_at: row.created_at,
        }
    }
}

/// Flag update request for shareable/archived endpoints
#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    /// New flag value
    pub value: bool,
}

fn validation_error(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}

async fn load_book(state: &AppState, id: Uuid) -> ApiResult<Book> {
    Book::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", id)))
}

/// List a new book owned by the caller
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBookRequest>,
) -> ApiResult<(StatusCode, Json<BookResponse>)> {
    req.validate().map_err(validation_error)?;

    let book = Book::create(
        &state.db,
        CreateBook {
            owner_id: auth.user_id,
            title: req.title,
            author_name: req.author_name,
            isbn: req.isbn,
            synopsis: req.synopsis,
            shareable: req.shareable,
        },
    )
    .await?;

    tracing::info!(book_id = %book.id, owner_id = %auth.user_id, "Book listed");

    Ok((StatusCode::CREATED, Json(BookResponse::from_book(book, 0.0))))
}

/// Get one book with its derived rating
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BookResponse>> {
    let book = load_book(&state, id).await?;
    let rate = Book::rate(&state.db, id).await?;

    Ok(Json(BookResponse::from_book(book, rate)))
}

/// List books displayable to the caller
///
/// Excludes archived books, non-shareable books, and the caller's own
/// books.
pub async fn list_displayable(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<BookResponse>>> {
    let page =
        Book::list_displayable(&state.db, auth.user_id, &params.to_request()).await?;

    Ok(Json(page.map(BookResponse::from)))
}

/// List the caller's own books
pub async fn list_owned(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<BookResponse>>> {
    let page = Book::list_by_owner(&state.db, auth.user_id, &params.to_request()).await?;

    Ok(Json(page.map(BookResponse::from)))
}

/// List the caller's loans that are not yet closed
pub async fn list_borrowed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<LoanResponse>>> {
    let page =
        Loan::list_borrowed_by_user(&state.db, auth.user_id, &params.to_request()).await?;

    Ok(Json(page.map(LoanResponse::from)))
}

/// List returns on the caller's books awaiting approval
pub async fn list_returned(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<LoanResponse>>> {
    let page =
        Loan::list_returned_for_owner(&state.db, auth.user_id, &params.to_request()).await?;

    Ok(Json(page.map(LoanResponse::from)))
}

/// Update the shareable flag (owner only)
///
/// # Errors
///
/// - `400 operation_not_permitted`: Caller does not own the book
/// - `404 Not Found`: Unknown book
pub async fn set_shareable(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<FlagRequest>,
) -> ApiResult<Json<BookResponse>> {
    let book = load_book(&state, id).await?;
    ensure_owner(&book, auth.user_id)?;

    let updated = Book::set_shareable(&state.db, id, req.value)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", id)))?;
    let rate = Book::rate(&state.db, id).await?;

    Ok(Json(BookResponse::from_book(updated, rate)))
}

/// Update the archived flag (owner only)
///
/// Archiving a book withdraws it from every lending operation,
/// including loans already in flight.
pub async fn set_archived(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<FlagRequest>,
) -> ApiResult<Json<BookResponse>> {
    let book = load_book(&state, id).await?;
    ensure_owner(&book, auth.user_id)?;

    let updated = Book::set_archived(&state.db, id, req.value)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", id)))?;
    let rate = Book::rate(&state.db, id).await?;

    Ok(Json(BookResponse::from_book(updated, rate)))
}

/// Upload a cover image for a book
///
/// Any authenticated member may upload a cover; the asset is stored
/// under the uploader's directory and the book keeps only the latest
/// reference. The previous asset stays on disk.
pub async fn upload_cover(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Cover upload is empty".to_string()));
    }

    // Existence check only; ownership is deliberately not required
    load_book(&state, id).await?;

    let reference = state
        .covers
        .store(auth.user_id, &body)
        .await
        .map_err(|e| ApiError::InternalError(format!("Cover store failed: {}", e)))?;

    Book::set_cover_reference(&state.db, id, &reference).await?;

    tracing::info!(book_id = %id, uploader = %auth.user_id, "Cover uploaded");

    Ok(StatusCode::NO_CONTENT)
}

/// Read a book's cover image
///
/// # Errors
///
/// - `404 Not Found`: Unknown book, or no cover uploaded
pub async fn read_cover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let book = load_book(&state, id).await?;

    let reference = book
        .cover_reference
        .ok_or_else(|| ApiError::NotFound(format!("Book {} has no cover", id)))?;

    let bytes = state
        .covers
        .read(&reference)
        .await
        .map_err(|e| ApiError::InternalError(format!("Cover read failed: {}", e)))?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} has no cover", id)))?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}

/// Borrow a book
///
/// The book must be in circulation and not the caller's own. The open
/// loan check and the insert run as one guarded statement, so two
/// concurrent borrowers cannot both succeed.
///
/// # Errors
///
/// - `400 operation_not_permitted`: Book unavailable, own book, or
///   already borrowed
/// - `404 Not Found`: Unknown book
pub async fn borrow_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<LoanCreatedResponse>)> {
    let book = load_book(&state, id).await?;
    ensure_available(&book)?;
    ensure_not_owner(&book, auth.user_id)?;

    let loan = Loan::borrow(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::OperationNotPermitted("The requested book is already borrowed".to_string())
        })?;

    tracing::info!(book_id = %id, borrower = %auth.user_id, loan_id = %loan.id, "Book borrowed");

    Ok((
        StatusCode::CREATED,
        Json(LoanCreatedResponse {
            loan_id: loan.id,
            book_id: loan.book_id,
        }),
    ))
}

/// Response for borrow and the two return transitions
#[derive(Debug, Serialize)]
pub struct LoanCreatedResponse {
    /// Loan ID
    pub loan_id: Uuid,

    /// Book ID
    pub book_id: Uuid,
}

/// Report a borrowed book as returned
///
/// Transitions the caller's loan from Borrowed to PendingApproval.
/// Availability is re-checked: a book archived or unshared mid-loan
/// blocks this step until the owner restores it.
///
/// # Errors
///
/// - `400 operation_not_permitted`: Book unavailable, own book, or no
///   active loan held by the caller
/// - `404 Not Found`: Unknown book
pub async fn return_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LoanCreatedResponse>> {
    let book = load_book(&state, id).await?;
    ensure_available(&book)?;
    ensure_not_owner(&book, auth.user_id)?;

    let loan = Loan::mark_returned(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::OperationNotPermitted("You did not borrow this book".to_string())
        })?;

    tracing::info!(book_id = %id, borrower = %auth.user_id, "Return reported");

    Ok(Json(LoanCreatedResponse {
        loan_id: loan.id,
        book_id: loan.book_id,
    }))
}

/// Approve a reported return
///
/// The pending loan is looked up through the book's recorded owner, so
/// only the owner's call finds anything to approve. The borrower is
/// rejected explicitly; a second approval finds no pending loan.
///
/// # Errors
///
/// - `400 operation_not_permitted`: Book unavailable, no pending
///   return on the caller's book, or self-approval
/// - `404 Not Found`: Unknown book
pub async fn approve_return(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LoanCreatedResponse>> {
    let book = load_book(&state, id).await?;
    ensure_available(&book)?;

    let loan = Loan::find_pending_approval(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::OperationNotPermitted(
                "The book is not returned yet. You cannot approve its return".to_string(),
            )
        })?;

    ensure_not_borrower(loan.borrower_id, auth.user_id)?;

    let closed = Loan::approve_return(&state.db, loan.id).await?.ok_or_else(|| {
        ApiError::OperationNotPermitted(
            "The book is not returned yet. You cannot approve its return".to_string(),
        )
    })?;

    tracing::info!(book_id = %id, loan_id = %closed.id, "Return approved");

    Ok(Json(LoanCreatedResponse {
        loan_id: closed.id,
        book_id: closed.book_id,
    }))
}
