use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{
        CreateScholarshipRequest, NewScholarship, Scholarship, ScholarshipPage, ScholarshipQuery,
        ScholarshipSearch, UpdateScholarshipRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

fn check_fee(label: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{} must be a non-negative amount",
            label
        )))
    }
}

fn check_required(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(AppError::BadRequest(format!("{} is required", label)))
    } else {
        Ok(())
    }
}

/// create_scholarship
///
/// [Admin Route] Publishes a scholarship. The publishing admin is recorded as
/// `postedBy`.
#[utoipa::path(
    post,
    path = "/scholarships",
    request_body = CreateScholarshipRequest,
    responses(
        (status = 201, description = "Created", body = Scholarship),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_scholarship(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateScholarshipRequest>,
) -> Result<(StatusCode, Json<Scholarship>)> {
    check_required("name", &payload.name)?;
    check_required("university", &payload.university)?;
    check_required("country", &payload.country)?;
    check_required("degree", &payload.degree)?;
    check_fee("applicationFees", payload.application_fees)?;
    check_fee("serviceCharge", payload.service_charge)?;

    let scholarship = state
        .repo
        .create_scholarship(NewScholarship {
            request: payload,
            posted_by: auth.email,
        })
        .await?;
    tracing::info!(scholarship_id = %scholarship.id, name = %scholarship.name, "scholarship published");
    Ok((StatusCode::CREATED, Json(scholarship)))
}

/// get_scholarships
///
/// [Public Route] Every scholarship, newest first.
#[utoipa::path(
    get,
    path = "/scholarships",
    responses((status = 200, description = "Scholarships", body = [Scholarship]))
)]
pub async fn get_scholarships(State(state): State<AppState>) -> Result<Json<Vec<Scholarship>>> {
    Ok(Json(state.repo.list_scholarships().await?))
}

/// search_scholarships
///
/// [Public Route] Substring search with filters, fee or recency ordering and paging.
/// The response carries the total match count for the pager.
#[utoipa::path(
    get,
    path = "/scholarships/search",
    params(ScholarshipQuery),
    responses((status = 200, description = "One page of matches", body = ScholarshipPage))
)]
pub async fn search_scholarships(
    State(state): State<AppState>,
    Query(query): Query<ScholarshipQuery>,
) -> Result<Json<ScholarshipPage>> {
    let search = ScholarshipSearch::from(query);
    let (scholarships, total) = state.repo.search_scholarships(&search).await?;
    Ok(Json(ScholarshipPage {
        scholarships,
        total,
        page: search.page,
        limit: search.limit,
    }))
}

/// get_scholarship
///
/// [Public Route] One scholarship by id.
#[utoipa::path(
    get,
    path = "/scholarship/{id}",
    params(("id" = Uuid, Path, description = "Scholarship ID")),
    responses(
        (status = 200, description = "Found", body = Scholarship),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_scholarship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Scholarship>> {
    state
        .repo
        .find_scholarship(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("scholarship not found".to_string()))
}

/// update_scholarship
///
/// [Admin Route] Partial update; only the provided fields change. Applications
/// already submitted keep the name and fees they were created with.
#[utoipa::path(
    patch,
    path = "/scholarships/{id}",
    params(("id" = Uuid, Path, description = "Scholarship ID")),
    request_body = UpdateScholarshipRequest,
    responses(
        (status = 200, description = "Updated", body = Scholarship),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_scholarship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScholarshipRequest>,
) -> Result<Json<Scholarship>> {
    if let Some(fees) = payload.application_fees {
        check_fee("applicationFees", fees)?;
    }
    if let Some(charge) = payload.service_charge {
        check_fee("serviceCharge", charge)?;
    }
    for (label, value) in [
        ("name", &payload.name),
        ("university", &payload.university),
        ("country", &payload.country),
        ("degree", &payload.degree),
    ] {
        if let Some(value) = value {
            check_required(label, value)?;
        }
    }

    state
        .repo
        .update_scholarship(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("scholarship not found".to_string()))
}

/// delete_scholarship
///
/// [Admin Route] Hard delete. Applications and reviews that reference it remain.
#[utoipa::path(
    delete,
    path = "/scholarships/{id}",
    params(("id" = Uuid, Path, description = "Scholarship ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_scholarship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.repo.delete_scholarship(id).await? {
        tracing::info!(scholarship_id = %id, "scholarship deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("scholarship not found".to_string()))
    }
}
