use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    handlers::{caller_role, ensure_owner_or_staff},
    models::{
        Application, ApplicationFilter, ApplicationQuery, ApplicationStatus,
        CreateApplicationRequest, FeedbackRequest, NewApplication, UpdateStatusRequest,
        normalize_email,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

fn application_not_found() -> AppError {
    AppError::NotFound("application not found".to_string())
}

/// create_application
///
/// [Authenticated Route] Submits an application for the caller. Scholarship name,
/// university, degree and fees are copied from the scholarship; the record always
/// starts `pending` and `unpaid`, whatever the client sent.
#[utoipa::path(
    post,
    path = "/applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Created", body = Application),
        (status = 404, description = "Unknown scholarship")
    )
)]
pub async fn create_application(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<Application>)> {
    let scholarship = state
        .repo
        .find_scholarship(payload.scholarship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("scholarship not found".to_string()))?;

    let user_name = match payload.user_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => Some(name),
        None => state
            .repo
            .find_user_by_email(&auth.email)
            .await?
            .and_then(|user| user.name),
    };

    let application = state
        .repo
        .create_application(NewApplication {
            scholarship_id: scholarship.id,
            user_email: auth.email,
            user_name,
            scholarship_name: scholarship.name,
            university_name: scholarship.university,
            degree: scholarship.degree,
            application_fees: scholarship.application_fees,
            service_charge: scholarship.service_charge,
        })
        .await?;

    tracing::info!(
        application_id = %application.id,
        scholarship_id = %application.scholarship_id,
        email = %application.user_email,
        "application submitted"
    );
    Ok((StatusCode::CREATED, Json(application)))
}

/// get_user_applications
///
/// [Authenticated Route] Applications submitted by one email, newest first. Readable
/// by that user and by staff.
#[utoipa::path(
    get,
    path = "/applications/{email}",
    params(("email" = String, Path, description = "Applicant email")),
    responses(
        (status = 200, description = "Applications", body = [Application]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_user_applications(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Application>>> {
    let email = normalize_email(&email);
    ensure_owner_or_staff(&state, &auth, &email).await?;

    let filter = ApplicationFilter {
        user_email: Some(email),
        ..ApplicationFilter::default()
    };
    Ok(Json(state.repo.list_applications(&filter).await?))
}

/// get_applications
///
/// [Staff Route] The review queue: every application, optionally narrowed by status
/// and payment status.
#[utoipa::path(
    get,
    path = "/applications",
    params(ApplicationQuery),
    responses((status = 200, description = "Applications", body = [Application]))
)]
pub async fn get_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationQuery>,
) -> Result<Json<Vec<Application>>> {
    let filter = ApplicationFilter {
        user_email: None,
        status: query.status,
        payment_status: query.payment_status,
    };
    Ok(Json(state.repo.list_applications(&filter).await?))
}

/// update_application_status
///
/// [Staff Route] Moves an application through the review states.
#[utoipa::path(
    patch,
    path = "/application/{id}/status",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Application),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_application_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Application>> {
    let application = state
        .repo
        .set_application_status(id, payload.status)
        .await?
        .ok_or_else(application_not_found)?;
    tracing::info!(application_id = %id, status = ?application.status, by = %auth.email, "application status changed");
    Ok(Json(application))
}

/// update_application_feedback
///
/// [Staff Route] Replaces the moderator feedback shown to the applicant.
#[utoipa::path(
    patch,
    path = "/application/{id}/feedback",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Updated", body = Application),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_application_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<Application>> {
    let feedback = payload.feedback.trim().to_string();
    if feedback.is_empty() {
        return Err(AppError::BadRequest("feedback is required".to_string()));
    }

    state
        .repo
        .set_application_feedback(id, feedback)
        .await?
        .map(Json)
        .ok_or_else(application_not_found)
}

/// delete_application
///
/// [Authenticated Route] Staff may delete any application. The applicant may withdraw
/// their own only while it is still `pending`.
#[utoipa::path(
    delete,
    path = "/application/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "No longer pending")
    )
)]
pub async fn delete_application(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let application = state
        .repo
        .find_application(id)
        .await?
        .ok_or_else(application_not_found)?;

    if !caller_role(&state, &auth).await?.is_staff() {
        if application.user_email != auth.email {
            return Err(AppError::Forbidden);
        }
        if application.status != ApplicationStatus::Pending {
            return Err(AppError::Conflict(
                "only pending applications can be withdrawn".to_string(),
            ));
        }
    }

    if !state.repo.delete_application(id).await? {
        return Err(application_not_found());
    }
    tracing::info!(application_id = %id, by = %auth.email, "application deleted");
    Ok(StatusCode::NO_CONTENT)
}
