use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    handlers::ensure_owner_or_staff,
    models::{
        CreateReviewRequest, NewReview, Review, ReviewFilter, ReviewQuery, UpdateReviewRequest,
        normalize_email,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

const REVIEW_EXISTS: &str = "review already exists";

fn check_rating(rating: i32) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ))
    }
}

fn check_comment(comment: &str) -> Result<()> {
    if comment.trim().is_empty() {
        Err(AppError::BadRequest("comment is required".to_string()))
    } else {
        Ok(())
    }
}

fn review_not_found() -> AppError {
    AppError::NotFound("review not found".to_string())
}

/// create_review
///
/// [Authenticated Route] Rates the scholarship behind one of the caller's
/// applications. A second review for the same application is refused with 409.
#[utoipa::path(
    post,
    path = "/reviews/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 403, description = "Not the applicant"),
        (status = 404, description = "Unknown application"),
        (status = 409, description = "Already reviewed")
    )
)]
pub async fn create_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    check_rating(payload.rating)?;
    check_comment(&payload.comment)?;

    let application = state
        .repo
        .find_application(application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("application not found".to_string()))?;
    if application.user_email != auth.email {
        return Err(AppError::Forbidden);
    }
    if state
        .repo
        .find_review_by_application(application_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(REVIEW_EXISTS.to_string()));
    }

    let user_name = payload.user_name.or(application.user_name);
    let review = state
        .repo
        .create_review(NewReview {
            application_id,
            scholarship_id: application.scholarship_id,
            scholarship_name: application.scholarship_name,
            university_name: application.university_name,
            user_email: auth.email,
            user_name,
            user_image: payload.user_image,
            rating: payload.rating,
            comment: payload.comment.trim().to_string(),
        })
        .await?
        // Lost a race against a concurrent submission.
        .ok_or_else(|| AppError::Conflict(REVIEW_EXISTS.to_string()))?;

    tracing::info!(review_id = %review.id, application_id = %application_id, "review posted");
    Ok((StatusCode::CREATED, Json(review)))
}

/// update_review
///
/// [Authenticated Route] The author edits the rating and/or comment.
#[utoipa::path(
    patch,
    path = "/review/{id}/edit",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<Review>> {
    if let Some(rating) = payload.rating {
        check_rating(rating)?;
    }
    if let Some(comment) = &payload.comment {
        check_comment(comment)?;
    }

    let review = state
        .repo
        .find_review(id)
        .await?
        .ok_or_else(review_not_found)?;
    if review.user_email != auth.email {
        return Err(AppError::Forbidden);
    }

    state
        .repo
        .update_review(id, payload)
        .await?
        .map(Json)
        .ok_or_else(review_not_found)
}

/// get_reviews
///
/// [Public Route] All reviews, newest first, optionally for one scholarship.
#[utoipa::path(
    get,
    path = "/reviews",
    params(ReviewQuery),
    responses((status = 200, description = "Reviews", body = [Review]))
)]
pub async fn get_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Vec<Review>>> {
    let filter = ReviewFilter {
        user_email: None,
        scholarship_id: query.scholarship_id,
    };
    Ok(Json(state.repo.list_reviews(&filter).await?))
}

/// get_user_reviews
///
/// [Authenticated Route] Reviews written by one email. Readable by the author and by
/// staff.
#[utoipa::path(
    get,
    path = "/reviews/{id}",
    params(("id" = String, Path, description = "Author email")),
    responses(
        (status = 200, description = "Reviews", body = [Review]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_user_reviews(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let email = normalize_email(&email);
    ensure_owner_or_staff(&state, &auth, &email).await?;

    let filter = ReviewFilter {
        user_email: Some(email),
        scholarship_id: None,
    };
    Ok(Json(state.repo.list_reviews(&filter).await?))
}

/// delete_review
///
/// [Authenticated Route] Removes a review. Allowed for the author and for staff.
#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let review = state
        .repo
        .find_review(id)
        .await?
        .ok_or_else(review_not_found)?;
    ensure_owner_or_staff(&state, &auth, &review.user_email).await?;

    if !state.repo.delete_review(id).await? {
        return Err(review_not_found());
    }
    tracing::info!(review_id = %id, by = %auth.email, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}
