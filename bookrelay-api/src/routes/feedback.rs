/// Feedback endpoints
///
/// # Endpoints
///
/// - `POST /v1/feedbacks` - Submit feedback for a book
/// - `GET  /v1/feedbacks/book/:book_id` - List a book's feedback

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use bookrelay_shared::{
    auth::{
        authorization::{ensure_available, ensure_not_owner},
        middleware::AuthContext,
    },
    models::{
        book::Book,
        feedback::{CreateFeedback, Feedback},
    },
    pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Submit feedback request
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitFeedbackRequest {
    /// Reviewed book
    pub book_id: Uuid,

    /// Numeric rating, 0 to 5 inclusive
    #[validate(range(min = 0.0, max = 5.0, message = "Note must be between 0 and 5"))]
    pub note: f64,

    /// Free-text comment
    #[validate(length(min = 1, message = "Comment is required"))]
    pub comment: String,
}

/// Submit feedback response
#[derive(Debug, Serialize)]
pub struct SubmitFeedbackResponse {
    /// New feedback ID
    pub feedback_id: Uuid,
}

/// Feedback representation in listings
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    /// Feedback ID
    pub id: Uuid,

    /// Numeric rating
    pub note: f64,

    /// Free-text comment
    pub comment: String,

    /// Whether the caller authored this feedback
    pub own_feedback: bool,

    /// When the feedback was submitted
    pub created_at: DateTime<Utc>,
}

/// Query parameters for the feedback listing
#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Zero-based page number
    pub page: Option<i64>,

    /// Page size
    pub size: Option<i64>,
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

/// Submit feedback for a book
///
/// The book must be in circulation and not the caller's own. Feedback
/// is accepted regardless of whether the caller ever borrowed the
/// book; the mean rating recomputes on the next read.
///
/// # Errors
///
/// - `400 operation_not_permitted`: Book unavailable or own book
/// - `404 Not Found`: Unknown book
/// - `422 Unprocessable Entity`: Note out of range or empty comment
pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SubmitFeedbackRequest>,
) -> ApiResult<(StatusCode, Json<SubmitFeedbackResponse>)> {
    req.validate().map_err(validation_error)?;

    let book = Book::find_by_id(&state.db, req.book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", req.book_id)))?;

    ensure_available(&book)?;
    ensure_not_owner(&book, auth.user_id)?;

    let feedback = Feedback::create(
        &state.db,
        CreateFeedback {
            book_id: req.book_id,
            author_id: auth.user_id,
            note: req.note,
            comment: req.comment,
        },
    )
    .await?;

    tracing::info!(book_id = %req.book_id, author = %auth.user_id, "Feedback submitted");

    Ok((
        StatusCode::CREATED,
        Json(SubmitFeedbackResponse {
            feedback_id: feedback.id,
        }),
    ))
}

/// List a book's feedback, newest first
///
/// Each entry carries an `own_feedback` flag so clients can offer
/// edit affordances without another lookup.
pub async fn list_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<FeedbackResponse>>> {
    let request = PageRequest::new(
        params.page.unwrap_or(0),
        params.size.unwrap_or(DEFAULT_PAGE_SIZE),
    );

    let page = Feedback::list_by_book(&state.db, book_id, &request).await?;

    let caller = auth.user_id;
    Ok(Json(page.map(|f| FeedbackResponse {
        id: f.id,
        note: f.note,
        comment: f.comment,
        own_feedback: f.author_id == caller,
        created_at: f.created_at,
    })))
}
